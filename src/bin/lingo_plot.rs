use lingo_lpp::cli::parse_cli;
use lingo_lpp::report::LogSink;
use lingo_lpp::{run_pipeline, PipelineError};

fn main() {
    let (data_root, figures_root, username, verbose) = parse_cli();
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut sink = LogSink;
    match run_pipeline(&data_root, &figures_root, &username, &mut sink) {
        Ok(dataset) => {
            log::info!(
                "finished run for user {}: {} languages loaded",
                username,
                dataset.len()
            );
        }
        Err(PipelineError::MissingUserFolder(folder)) => {
            log::error!(
                "no export folder for user {}: {} does not exist",
                username,
                folder.display()
            );
            std::process::exit(1);
        }
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        }
    }
}

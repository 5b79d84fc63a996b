use super::VERSION;
use clap::{App, Arg};
use std::path::PathBuf;

/// Takes the CLI arguments that control one progress-chart run.
pub fn parse_cli() -> (PathBuf, PathBuf, String, bool) {
    let arg_username = Arg::with_name("username")
        .help("name of the user whose exports are plotted")
        .short("u")
        .long("user")
        .takes_value(true)
        .required(true);
    let arg_datafolder = Arg::with_name("data_folder")
        .help("folder holding one export subfolder per user")
        .short("d")
        .long("data")
        .takes_value(true)
        .default_value("data");
    let arg_figuresfolder = Arg::with_name("figures_folder")
        .help("folder where the chart images are written")
        .short("o")
        .long("figures")
        .takes_value(true)
        .default_value("figures");
    let arg_verbose = Arg::with_name("verbose")
        .help("print verbose information")
        .short("v")
        .long("verbose")
        .takes_value(false)
        .required(false);
    let cli_args = App::new("lingo_plot")
        .version(VERSION.unwrap_or("unknown"))
        .about("cli app to plot language learning progress charts")
        .arg(arg_username)
        .arg(arg_datafolder)
        .arg(arg_figuresfolder)
        .arg(arg_verbose)
        .get_matches();
    let username = String::from(cli_args.value_of("username").unwrap_or_default());
    let data_root = PathBuf::from(cli_args.value_of("data_folder").unwrap_or_default());
    let figures_root = PathBuf::from(cli_args.value_of("figures_folder").unwrap_or_default());
    let verbose: bool = cli_args.is_present("verbose");
    (data_root, figures_root, username, verbose)
}

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::report::MessageSink;
use crate::{LanguageSeries, Metric, UserDataset};

/// Loads every csv export in `{data_root}/{username}/` into a dataset
/// keyed by file stem. Files with other extensions are ignored. A file
/// that fails to parse is reported through the sink and its language is
/// omitted from the dataset; only a missing user folder aborts the load.
///
/// File names are sorted before parsing so discovery order, and with it
/// the order of everything downstream, does not depend on the platform's
/// directory enumeration.
pub fn load_user_data(
    data_root: &Path,
    username: &str,
    sink: &mut dyn MessageSink,
) -> Result<UserDataset> {
    let userfolder = data_root.join(username);
    if !userfolder.is_dir() {
        return Err(PipelineError::MissingUserFolder(userfolder));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(&userfolder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension() == Some(OsStr::new("csv")))
        .collect();
    files.sort();

    let mut dataset = UserDataset::new();
    for path in files {
        let language = match path.file_stem().and_then(OsStr::to_str) {
            Some(stem) => stem.to_string(),
            None => continue,
        };
        match LanguageSeries::from_csv(&path) {
            Ok(series) => {
                sink.info(&format!(
                    "loaded {} rows for language {}",
                    series.len(),
                    language
                ));
                dataset.insert(language, series);
            }
            Err(err) => {
                sink.error(&format!("{}, language {} omitted", err, language));
            }
        }
    }
    Ok(dataset)
}

impl LanguageSeries {
    /// Parses one semicolon-delimited export file. The header row decides
    /// which columns the series carries; unrecognized columns are ignored.
    /// Date cells are kept as raw text (parsed later by normalization),
    /// metric cells must be numeric.
    pub fn from_csv(path: &Path) -> Result<LanguageSeries> {
        let parse_err = |message: String| PipelineError::FileParse {
            path: path.to_path_buf(),
            message,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .from_path(path)
            .map_err(|e| parse_err(e.to_string()))?;
        let headers = reader
            .headers()
            .map_err(|e| parse_err(e.to_string()))?
            .clone();

        let date_idx = headers.iter().position(|h| h == "date");
        let metric_idx: Vec<(Metric, usize)> = Metric::ALL
            .iter()
            .filter_map(|&m| {
                headers
                    .iter()
                    .position(|h| h == m.column())
                    .map(|i| (m, i))
            })
            .collect();

        let mut series = LanguageSeries::new();
        if date_idx.is_some() {
            series.dates = Some(Vec::new());
        }
        for &(metric, _) in &metric_idx {
            *series.column_slot(metric) = Some(Vec::new());
        }

        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| parse_err(e.to_string()))?;
            if let (Some(idx), Some(dates)) = (date_idx, series.dates.as_mut()) {
                dates.push(record.get(idx).unwrap_or("").to_string());
            }
            for &(metric, idx) in &metric_idx {
                let cell = record.get(idx).unwrap_or("");
                let value: f64 = cell.trim().parse().map_err(|_| {
                    parse_err(format!(
                        "row {}: column `{}`: invalid number `{}`",
                        row,
                        metric.column(),
                        cell
                    ))
                })?;
                if let Some(column) = series.column_slot(metric).as_mut() {
                    column.push(value);
                }
            }
        }
        Ok(series)
    }
}

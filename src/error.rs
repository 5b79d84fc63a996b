use std::path::PathBuf;
use thiserror::Error;

/// All conditions the pipeline can report or fail with.
///
/// Only `MissingUserFolder` (and filesystem failures while preparing the
/// output tree) abort a run. The remaining variants are isolated to a
/// single file, language, row, or metric; they are formatted here once and
/// passed to the message sink so the run can continue.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The per-user input folder does not exist.
    #[error("user data folder not found: {0}")]
    MissingUserFolder(PathBuf),

    /// An individual export file could not be parsed.
    #[error("failed to parse {path}: {message}")]
    FileParse { path: PathBuf, message: String },

    /// A language has no `date` column, so it cannot be placed on the
    /// time axis at all.
    #[error("language {language}: missing `date` column, charts skipped")]
    MissingDateColumn { language: String },

    /// A language lacks one of the four metric columns; only that chart
    /// is skipped.
    #[error("language {language}: missing `{column}` column, chart skipped")]
    MissingMetricColumn {
        language: String,
        column: &'static str,
    },

    /// A row's date value does not match the `DD-MM-YYYY` format; the row
    /// is dropped from the normalized series.
    #[error("language {language}: row {row}: malformed date value `{value}`, row dropped")]
    MalformedDateValue {
        language: String,
        row: usize,
        value: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_user_folder_display() {
        let err = PipelineError::MissingUserFolder(PathBuf::from("data/nobody"));
        assert_eq!(err.to_string(), "user data folder not found: data/nobody");
    }

    #[test]
    fn test_missing_metric_column_display() {
        let err = PipelineError::MissingMetricColumn {
            language: "spanish".to_string(),
            column: "level",
        };
        assert_eq!(
            err.to_string(),
            "language spanish: missing `level` column, chart skipped"
        );
    }

    #[test]
    fn test_malformed_date_value_display() {
        let err = PipelineError::MalformedDateValue {
            language: "korean".to_string(),
            row: 2,
            value: "31-31-2020".to_string(),
        };
        assert!(err.to_string().contains("row 2"));
        assert!(err.to_string().contains("31-31-2020"));
    }
}

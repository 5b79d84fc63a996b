use chrono::prelude::*;

use crate::error::PipelineError;
use crate::report::MessageSink;
use crate::{seconds_for_date, LanguageSeries, Metric, UserDataset, DATE_FORMAT};

/// Adds the `seconds_since_epoch` column to every language in the dataset.
///
/// A language without a `date` column is reported and left unmodified; the
/// absent column marks it ineligible for export. A row whose date does not
/// parse is removed from all columns of its language and reported with its
/// position, the rest of the language is normalized as usual. Returns the
/// number of languages that were skipped entirely.
pub fn add_time_column(dataset: &mut UserDataset, sink: &mut dyn MessageSink) -> usize {
    let mut skipped = 0;
    for (language, series) in dataset.iter_mut() {
        if series.dates.is_none() {
            sink.error(
                &PipelineError::MissingDateColumn {
                    language: language.to_string(),
                }
                .to_string(),
            );
            skipped += 1;
            continue;
        }
        for (row, value) in series.derive_seconds() {
            sink.error(
                &PipelineError::MalformedDateValue {
                    language: language.to_string(),
                    row,
                    value,
                }
                .to_string(),
            );
        }
    }
    skipped
}

impl LanguageSeries {
    /// Parses the raw date column and stores the derived whole-seconds
    /// column, aligned by row. Rows with malformed dates are removed from
    /// every column so the columns stay parallel; the removed rows are
    /// returned as `(position, raw value)` pairs. Does nothing when the
    /// series has no date column.
    pub fn derive_seconds(&mut self) -> Vec<(usize, String)> {
        let dates = match self.dates.take() {
            Some(dates) => dates,
            None => return Vec::new(),
        };

        let mut seconds = Vec::with_capacity(dates.len());
        let mut keep = Vec::with_capacity(dates.len());
        let mut dropped = Vec::new();
        for (row, value) in dates.iter().enumerate() {
            match NaiveDate::parse_from_str(value.trim(), DATE_FORMAT) {
                Ok(date) => {
                    keep.push(true);
                    seconds.push(seconds_for_date(date));
                }
                Err(_) => {
                    keep.push(false);
                    dropped.push((row, value.clone()));
                }
            }
        }

        if dropped.is_empty() {
            self.dates = Some(dates);
        } else {
            let mut dates = dates;
            retain_rows(&mut dates, &keep);
            self.dates = Some(dates);
            for metric in Metric::ALL.iter() {
                if let Some(column) = self.column_slot(*metric).as_mut() {
                    retain_rows(column, &keep);
                }
            }
        }
        self.seconds_since_epoch = Some(seconds);
        dropped
    }
}

fn retain_rows<T>(column: &mut Vec<T>, keep: &[bool]) {
    let mut row = 0;
    column.retain(|_| {
        let keep_row = keep[row];
        row += 1;
        keep_row
    });
}

use chrono::prelude::*;
use chrono::Duration;
use std::fmt;
use std::path::Path;

pub mod axis;
pub mod chart;
pub mod cli;
pub mod error;
pub mod load;
pub mod normalize;
pub mod report;

pub use error::{PipelineError, Result};
pub use report::MessageSink;

pub const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

/// Format of the `date` column in the source export files.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// All derived time values are measured from 00:00 on January 1st of this
/// year. The language platform the exports come from did not exist before
/// 2011, so every real date lands after the epoch.
pub const EPOCH_YEAR: i32 = 2010;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// 00:00 on January 1st of [`EPOCH_YEAR`].
pub fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(EPOCH_YEAR, 1, 1).unwrap()
}

/// Whole seconds from the epoch to midnight of the given date.
pub fn seconds_for_date(date: NaiveDate) -> i64 {
    (date - epoch_date()).num_days() * SECONDS_PER_DAY
}

/// Calendar day reached by advancing the epoch by the given seconds.
/// Time-of-day is discarded, the inverse of [`seconds_for_date`].
pub fn date_from_seconds(seconds: i64) -> NaiveDate {
    let midnight = epoch_date().and_hms_opt(0, 0, 0).unwrap();
    (midnight + Duration::seconds(seconds)).date()
}

/// The four tracked progress metrics, each rendered as one chart per
/// language. The order here is the export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    DailyXp,
    TotalXp,
    TotalWordsLearned,
    Level,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::DailyXp,
        Metric::TotalXp,
        Metric::TotalWordsLearned,
        Metric::Level,
    ];

    /// Column name in the source files, also the output file stem.
    pub fn column(self) -> &'static str {
        match self {
            Metric::DailyXp => "daily_xp",
            Metric::TotalXp => "total_xp",
            Metric::TotalWordsLearned => "total_words_learned",
            Metric::Level => "level",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Metric::DailyXp => "Daily Experience",
            Metric::TotalXp => "Total Experience",
            Metric::TotalWordsLearned => "Total Words Learned",
            Metric::Level => "Level",
        }
    }

    pub fn y_desc(self) -> &'static str {
        match self {
            Metric::DailyXp | Metric::TotalXp => "Experience",
            Metric::TotalWordsLearned => "Words",
            Metric::Level => "Level",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// The progress time series of a single language, column-oriented.
///
/// Which columns are present is decided by the header row of the source
/// file, so presence is a per-language condition; all present columns have
/// the same number of rows. `dates` holds the raw column text;
/// `seconds_since_epoch` is only added by the normalization stage.
#[derive(Debug, Clone, Default)]
pub struct LanguageSeries {
    pub dates: Option<Vec<String>>,
    pub daily_xp: Option<Vec<f64>>,
    pub total_xp: Option<Vec<f64>>,
    pub total_words_learned: Option<Vec<f64>>,
    pub level: Option<Vec<f64>>,
    pub seconds_since_epoch: Option<Vec<i64>>,
}

impl LanguageSeries {
    pub fn new() -> LanguageSeries {
        LanguageSeries::default()
    }

    pub fn metric(&self, metric: Metric) -> Option<&[f64]> {
        match metric {
            Metric::DailyXp => self.daily_xp.as_deref(),
            Metric::TotalXp => self.total_xp.as_deref(),
            Metric::TotalWordsLearned => self.total_words_learned.as_deref(),
            Metric::Level => self.level.as_deref(),
        }
    }

    pub(crate) fn column_slot(&mut self, metric: Metric) -> &mut Option<Vec<f64>> {
        match metric {
            Metric::DailyXp => &mut self.daily_xp,
            Metric::TotalXp => &mut self.total_xp,
            Metric::TotalWordsLearned => &mut self.total_words_learned,
            Metric::Level => &mut self.level,
        }
    }

    /// Number of rows, taken from whichever column is present.
    pub fn len(&self) -> usize {
        if let Some(dates) = &self.dates {
            return dates.len();
        }
        Metric::ALL
            .iter()
            .find_map(|&m| self.metric(m).map(|col| col.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// All loaded language series of one user, keyed by the source file stem.
/// Iteration follows discovery order, which keeps logging and export
/// ordering deterministic between runs.
#[derive(Debug, Default)]
pub struct UserDataset {
    entries: Vec<(String, LanguageSeries)>,
}

impl UserDataset {
    pub fn new() -> UserDataset {
        UserDataset::default()
    }

    pub fn insert(&mut self, language: String, series: LanguageSeries) {
        self.entries.push((language, series));
    }

    pub fn get(&self, language: &str) -> Option<&LanguageSeries> {
        self.entries
            .iter()
            .find(|(name, _)| name == language)
            .map(|(_, series)| series)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LanguageSeries)> {
        self.entries
            .iter()
            .map(|(name, series)| (name.as_str(), series))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut LanguageSeries)> {
        self.entries
            .iter_mut()
            .map(|(name, series)| (name.as_str(), series))
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Runs the full load, normalize, and export pipeline for one user and
/// returns the loaded dataset so a caller can inspect it or hand it to a
/// display layer. The only fatal dataset condition is a missing user
/// folder; everything else is reported through the sink and the run
/// continues with whatever remains usable.
pub fn run_pipeline(
    data_root: &Path,
    output_root: &Path,
    username: &str,
    sink: &mut dyn MessageSink,
) -> Result<UserDataset> {
    sink.info(&format!("loading export files for user {}", username));
    let mut dataset = load::load_user_data(data_root, username, sink)?;
    normalize::add_time_column(&mut dataset, sink);
    chart::export_charts(&dataset, username, output_root, sink)?;
    Ok(dataset)
}

pub fn min_and_max<T: std::cmp::PartialOrd + Copy>(s: &[T]) -> (T, T) {
    let mut self_iter = s.iter();
    let (mut min, mut max) = match self_iter.next() {
        Some(v) => (*v, *v),
        None => panic!("could not iterate over slice"),
    };
    for es in self_iter {
        if *es > max {
            max = *es
        }
        if *es < min {
            min = *es
        }
    }
    (min, max)
}

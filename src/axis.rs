use chrono::prelude::*;
use plotters::coord::ranged1d::{KeyPointHint, NoDefaultFormatting, Ranged, ValueFormatter};
use std::ops::Range;

use crate::{date_from_seconds, seconds_for_date, EPOCH_YEAR};

/// One x-axis tick: the first of a calendar month, as seconds since the
/// epoch, with its `MM/YYYY` label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeTick {
    pub seconds_since_epoch: i64,
    pub label: String,
}

/// Builds the shared x-axis tick table, one tick per calendar month from
/// January of the epoch year through the month of `today`, inclusive.
/// Recomputed per run so coverage always reaches the current month; every
/// chart of a run shares the same table.
pub fn month_ticks(today: NaiveDate) -> Vec<TimeTick> {
    let mut ticks = Vec::new();
    for year in EPOCH_YEAR..=today.year() {
        for month in 1..=12u32 {
            if year == today.year() && month > today.month() {
                break;
            }
            let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
            ticks.push(TimeTick {
                seconds_since_epoch: seconds_for_date(first),
                label: format!("{:02}/{:04}", month, year),
            });
        }
    }
    ticks
}

/// Plotters x coordinate that maps seconds since the epoch linearly onto
/// the drawing area and places tick marks exactly at the entries of the
/// shared month table that fall inside the plotted range.
pub struct MonthAxis<'a> {
    range: Range<i64>,
    ticks: &'a [TimeTick],
}

impl<'a> MonthAxis<'a> {
    pub fn new(range: Range<i64>, ticks: &'a [TimeTick]) -> MonthAxis<'a> {
        MonthAxis { range, ticks }
    }
}

impl Ranged for MonthAxis<'_> {
    type FormatOption = NoDefaultFormatting;
    type ValueType = i64;

    fn map(&self, value: &i64, limit: (i32, i32)) -> i32 {
        let span = self.range.end - self.range.start;
        if span <= 0 {
            return limit.0;
        }
        let fraction = (value - self.range.start) as f64 / span as f64;
        limit.0 + ((limit.1 - limit.0) as f64 * fraction).round() as i32
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<i64> {
        let max_points = hint.max_num_points();
        if max_points == 0 {
            return Vec::new();
        }
        let in_range: Vec<i64> = self
            .ticks
            .iter()
            .map(|t| t.seconds_since_epoch)
            .filter(|s| self.range.contains(s))
            .collect();
        if in_range.len() <= max_points {
            return in_range;
        }
        // more months than labels fit, keep every n-th tick
        let stride = (in_range.len() + max_points - 1) / max_points;
        in_range.into_iter().step_by(stride).collect()
    }

    fn range(&self) -> Range<i64> {
        self.range.clone()
    }
}

impl ValueFormatter<i64> for MonthAxis<'_> {
    fn format_ext(&self, value: &i64) -> String {
        match self
            .ticks
            .binary_search_by_key(value, |t| t.seconds_since_epoch)
        {
            Ok(i) => self.ticks[i].label.clone(),
            Err(_) => date_from_seconds(*value).format("%m/%Y").to_string(),
        }
    }
}

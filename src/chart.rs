use chrono::prelude::*;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontTransform;
use std::fs;
use std::path::Path;

use crate::axis::{month_ticks, MonthAxis, TimeTick};
use crate::error::{PipelineError, Result};
use crate::report::MessageSink;
use crate::{min_and_max, Metric, UserDataset, SECONDS_PER_DAY};

pub const PLOT_DPI: u32 = 400;

// matplotlib-sized 6.4 x 4.8 inch figure at PLOT_DPI
const CHART_WIDTH: u32 = (6.4 * PLOT_DPI as f64) as u32;
const CHART_HEIGHT: u32 = (4.8 * PLOT_DPI as f64) as u32;

/// Days of x-axis padding beyond the observed data range, on each side.
const X_MARGIN_DAYS: i64 = 10;

/// Per-run counts of metric charts written and metric charts that could
/// not be produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub exported: usize,
    pub failed: usize,
}

/// Holds the pixel canvases of every chart rendered during one export run.
///
/// Canvases are not released one by one; the whole batch is dropped
/// together at the end of the run, so peak memory is bounded by the chart
/// count of a single run and nothing is held past it.
pub struct CanvasPool {
    canvases: Vec<Vec<u8>>,
}

impl CanvasPool {
    pub fn new() -> CanvasPool {
        CanvasPool {
            canvases: Vec::new(),
        }
    }

    /// Number of canvases currently open.
    pub fn open(&self) -> usize {
        self.canvases.len()
    }

    /// Renders one metric chart into a fresh canvas, writes the canvas to
    /// `path` as a png, and keeps the canvas open until
    /// [`CanvasPool::release_all`].
    fn render_to_png(
        &mut self,
        path: &Path,
        seconds: &[i64],
        values: &[f64],
        ticks: &[TimeTick],
        metric: Metric,
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut pixels = vec![255u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut pixels, (CHART_WIDTH, CHART_HEIGHT))
                .into_drawing_area();
            draw_metric_chart(&root, seconds, values, ticks, metric)?;
            root.present()?;
        }
        image::save_buffer(
            path,
            &pixels,
            CHART_WIDTH,
            CHART_HEIGHT,
            image::ExtendedColorType::Rgb8,
        )?;
        self.canvases.push(pixels);
        Ok(())
    }

    /// Drops every canvas of the batch at once; returns how many were open.
    pub fn release_all(&mut self) -> usize {
        let open = self.canvases.len();
        self.canvases.clear();
        open
    }
}

impl Default for CanvasPool {
    fn default() -> Self {
        CanvasPool::new()
    }
}

/// Renders one line chart per metric for every eligible language of the
/// dataset and writes them under `{output_root}/{username}/{language}/`.
///
/// A language without a derived time column is ineligible: no subdirectory
/// is created and all four of its metrics count as failed. A missing
/// metric column fails only that chart and leaves any file from an earlier
/// run in place. Directories are created idempotently; nothing is deleted.
/// The per-item outcome counts are reported through the sink at the end.
pub fn export_charts(
    dataset: &UserDataset,
    username: &str,
    output_root: &Path,
    sink: &mut dyn MessageSink,
) -> Result<ExportSummary> {
    let user_dir = output_root.join(username);
    fs::create_dir_all(&user_dir)?;

    let ticks = month_ticks(Local::now().date_naive());
    let mut pool = CanvasPool::new();
    let mut summary = ExportSummary::default();

    for (language, series) in dataset.iter() {
        let seconds = match series.seconds_since_epoch.as_deref() {
            Some(seconds) if !seconds.is_empty() => seconds,
            Some(_) => {
                sink.error(&format!(
                    "language {}: no rows to plot, charts skipped",
                    language
                ));
                summary.failed += Metric::ALL.len();
                continue;
            }
            // already reported by normalization, still four missed charts
            None => {
                summary.failed += Metric::ALL.len();
                continue;
            }
        };

        let language_dir = user_dir.join(language);
        if let Err(err) = fs::create_dir_all(&language_dir) {
            sink.error(&format!(
                "language {}: could not create {}: {}",
                language,
                language_dir.display(),
                err
            ));
            summary.failed += Metric::ALL.len();
            continue;
        }

        for &metric in Metric::ALL.iter() {
            let values = match series.metric(metric) {
                Some(values) => values,
                None => {
                    sink.error(
                        &PipelineError::MissingMetricColumn {
                            language: language.to_string(),
                            column: metric.column(),
                        }
                        .to_string(),
                    );
                    summary.failed += 1;
                    continue;
                }
            };
            let path = language_dir.join(format!("{}.png", metric.column()));
            match pool.render_to_png(&path, seconds, values, &ticks, metric) {
                Ok(()) => {
                    summary.exported += 1;
                    sink.info(&format!(
                        "exported {} chart for language {}",
                        metric.column(),
                        language
                    ));
                }
                Err(err) => {
                    summary.failed += 1;
                    sink.error(&format!(
                        "language {}: failed to render {} chart: {}",
                        language,
                        metric.column(),
                        err
                    ));
                }
            }
        }
    }

    // every canvas of the run is released here, none survives the stage
    pool.release_all();
    sink.info(&format!(
        "chart export finished: {} exported, {} failed",
        summary.exported, summary.failed
    ));
    Ok(summary)
}

/// Draws a single solid line of the metric against the shared month axis.
/// X limits are the observed data range padded by [`X_MARGIN_DAYS`] on
/// each side; y limits pad the value range by a tenth.
fn draw_metric_chart(
    root: &DrawingArea<BitMapBackend, Shift>,
    seconds: &[i64],
    values: &[f64],
    ticks: &[TimeTick],
    metric: Metric,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    root.fill(&WHITE)?;
    let (xmin, xmax) = min_and_max(seconds);
    let xmin = xmin - X_MARGIN_DAYS * SECONDS_PER_DAY;
    let xmax = xmax + X_MARGIN_DAYS * SECONDS_PER_DAY;
    let (ymin, ymax) = min_and_max(values);
    let ymargin = if ymax > ymin { (ymax - ymin) / 10. } else { 1. };
    let ymin = ymin - ymargin;
    let ymax = ymax + ymargin;

    let mut chart = ChartBuilder::on(root)
        .caption(metric.title(), ("sans-serif", 56))
        .margin(30)
        .x_label_area_size(220)
        .y_label_area_size(160)
        .build_cartesian_2d(MonthAxis::new(xmin..xmax, ticks), ymin..ymax)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .axis_style(ShapeStyle::from(&BLACK).stroke_width(1))
        .set_all_tick_mark_size(8)
        .label_style(("sans-serif", 36))
        .x_label_style(
            ("sans-serif", 32)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .x_labels(24)
        .y_label_formatter(&|v: &f64| format!("{:.0}", v))
        .x_desc("Date")
        .y_desc(metric.y_desc())
        .draw()?;

    chart.draw_series(LineSeries::new(
        seconds.iter().zip(values.iter()).map(|(&s, &v)| (s, v)),
        BLUE.stroke_width(1),
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::add_time_column;
    use crate::report::SessionLog;
    use crate::LanguageSeries;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn spanish_series() -> LanguageSeries {
        let mut series = LanguageSeries::new();
        series.dates = Some(vec![
            "01-01-2020".to_string(),
            "02-01-2020".to_string(),
            "03-01-2020".to_string(),
        ]);
        series.daily_xp = Some(vec![10.0, 20.0, 15.0]);
        series
    }

    fn full_series() -> LanguageSeries {
        let mut series = LanguageSeries::new();
        series.dates = Some(vec!["05-03-2021".to_string(), "06-03-2021".to_string()]);
        series.daily_xp = Some(vec![30.0, 12.0]);
        series.total_xp = Some(vec![130.0, 142.0]);
        series.total_words_learned = Some(vec![51.0, 55.0]);
        series.level = Some(vec![4.0, 4.0]);
        series
    }

    fn png_set(dir: &Path) -> BTreeSet<PathBuf> {
        let mut set = BTreeSet::new();
        if !dir.is_dir() {
            return set;
        }
        for entry in fs::read_dir(dir).unwrap() {
            set.insert(entry.unwrap().path());
        }
        set
    }

    #[test]
    fn test_partial_language_exports_only_present_metrics() {
        let out = tempfile::tempdir().unwrap();
        let mut dataset = UserDataset::new();
        dataset.insert("spanish".to_string(), spanish_series());
        let mut sink = SessionLog::new();
        add_time_column(&mut dataset, &mut sink);

        let summary = export_charts(&dataset, "tester", out.path(), &mut sink).unwrap();
        assert_eq!(
            summary,
            ExportSummary {
                exported: 1,
                failed: 3
            }
        );
        let spanish_dir = out.path().join("tester").join("spanish");
        assert!(spanish_dir.join("daily_xp.png").is_file());
        assert_eq!(png_set(&spanish_dir).len(), 1);
        // one missing-column error for each absent metric
        let missing: Vec<&str> = sink
            .errors()
            .map(|e| e.message.as_str())
            .filter(|m| m.contains("missing"))
            .collect();
        assert_eq!(missing.len(), 3);
        assert!(missing.iter().any(|m| m.contains("`total_xp`")));
        assert!(missing.iter().any(|m| m.contains("`total_words_learned`")));
        assert!(missing.iter().any(|m| m.contains("`level`")));
    }

    #[test]
    fn test_full_language_exports_all_four_charts() {
        let out = tempfile::tempdir().unwrap();
        let mut dataset = UserDataset::new();
        dataset.insert("korean".to_string(), full_series());
        let mut sink = SessionLog::new();
        add_time_column(&mut dataset, &mut sink);

        let summary = export_charts(&dataset, "tester", out.path(), &mut sink).unwrap();
        assert_eq!(
            summary,
            ExportSummary {
                exported: 4,
                failed: 0
            }
        );
        let korean_dir = out.path().join("tester").join("korean");
        for metric in Metric::ALL.iter() {
            assert!(korean_dir.join(format!("{}.png", metric.column())).is_file());
        }
    }

    #[test]
    fn test_ineligible_language_gets_no_directory() {
        let out = tempfile::tempdir().unwrap();
        let mut dataset = UserDataset::new();
        let mut nodate = LanguageSeries::new();
        nodate.daily_xp = Some(vec![1.0, 2.0]);
        dataset.insert("nodate".to_string(), nodate);
        let mut sink = SessionLog::new();
        add_time_column(&mut dataset, &mut sink);

        let summary = export_charts(&dataset, "tester", out.path(), &mut sink).unwrap();
        assert_eq!(
            summary,
            ExportSummary {
                exported: 0,
                failed: 4
            }
        );
        assert!(!out.path().join("tester").join("nodate").exists());
        // user directory is still prepared for future runs
        assert!(out.path().join("tester").is_dir());
    }

    #[test]
    fn test_eligible_language_without_rows_is_skipped() {
        let out = tempfile::tempdir().unwrap();
        let mut dataset = UserDataset::new();
        let mut empty = LanguageSeries::new();
        empty.dates = Some(Vec::new());
        empty.daily_xp = Some(Vec::new());
        dataset.insert("empty".to_string(), empty);
        let mut sink = SessionLog::new();
        add_time_column(&mut dataset, &mut sink);

        let summary = export_charts(&dataset, "tester", out.path(), &mut sink).unwrap();
        assert_eq!(summary.exported, 0);
        assert_eq!(summary.failed, 4);
        assert!(!out.path().join("tester").join("empty").exists());
        assert!(sink
            .errors()
            .any(|e| e.message.contains("no rows to plot")));
    }

    #[test]
    fn test_export_is_idempotent_across_runs() {
        let out = tempfile::tempdir().unwrap();
        let mut dataset = UserDataset::new();
        dataset.insert("spanish".to_string(), spanish_series());
        dataset.insert("korean".to_string(), full_series());
        let mut sink = SessionLog::new();
        add_time_column(&mut dataset, &mut sink);

        let first = export_charts(&dataset, "tester", out.path(), &mut sink).unwrap();
        let files_after_first: Vec<_> = [
            png_set(&out.path().join("tester").join("spanish")),
            png_set(&out.path().join("tester").join("korean")),
        ]
        .to_vec();
        let second = export_charts(&dataset, "tester", out.path(), &mut sink).unwrap();
        let files_after_second: Vec<_> = [
            png_set(&out.path().join("tester").join("spanish")),
            png_set(&out.path().join("tester").join("korean")),
        ]
        .to_vec();
        assert_eq!(first, second);
        assert_eq!(files_after_first, files_after_second);
    }

    #[test]
    fn test_canvas_pool_releases_batch_at_once() {
        let out = tempfile::tempdir().unwrap();
        let ticks = month_ticks(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        let seconds: Vec<i64> = vec![0, SECONDS_PER_DAY, 2 * SECONDS_PER_DAY];
        let values = vec![1.0, 3.0, 2.0];
        let mut pool = CanvasPool::new();
        for (n, metric) in [Metric::DailyXp, Metric::Level].iter().enumerate() {
            let path = out.path().join(format!("chart_{}.png", n));
            pool.render_to_png(&path, &seconds, &values, &ticks, *metric)
                .unwrap();
            assert!(path.is_file());
        }
        assert_eq!(pool.open(), 2);
        assert_eq!(pool.release_all(), 2);
        assert_eq!(pool.open(), 0);
    }
}

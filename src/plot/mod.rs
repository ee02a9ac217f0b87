//! Chart descriptions and their renderers.
//!
//! A [`Chart`] is render-only data: titles, axis kind and a list of series,
//! all computed up front. `ascii` draws it into a fixed character grid and
//! `svg` draws it with Plotters. [`ChartSink`] sends a chart to whichever
//! outputs the run asked for.

pub mod ascii;
pub mod charts;
pub mod svg;

pub use ascii::*;
pub use charts::*;
pub use svg::*;

use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};

use crate::domain::OutputConfig;
use crate::error::AppError;

/// How x-values are interpreted when labelling the axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XAxis {
    /// Day offsets from `origin`, labelled as calendar dates.
    Dates { origin: NaiveDate },
    /// Day offsets labelled as numbers.
    Days,
    /// Plain numeric values.
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Line,
    Points,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub kind: SeriesKind,
    /// Finite `(x, y)` pairs only.
    pub points: Vec<(f64, f64)>,
}

impl Series {
    fn new(label: impl Into<String>, kind: SeriesKind, points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            label: label.into(),
            kind,
            points: points
                .into_iter()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .collect(),
        }
    }

    /// A connected line; non-finite points are dropped.
    pub fn line(label: impl Into<String>, points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self::new(label, SeriesKind::Line, points)
    }

    /// Unconnected markers; non-finite points are dropped.
    pub fn points(label: impl Into<String>, points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self::new(label, SeriesKind::Points, points)
    }
}

/// Text placed next to a data point.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_axis: XAxis,
    /// Plot both axes on a base-10 log scale.
    pub log_log: bool,
    pub series: Vec<Series>,
    pub annotations: Vec<Annotation>,
}

impl Chart {
    pub fn new(title: impl Into<String>, x_axis: XAxis) -> Self {
        Self {
            title: title.into(),
            x_label: String::new(),
            y_label: String::new(),
            x_axis,
            log_log: false,
            series: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn labels(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x_label = x.into();
        self.y_label = y.into();
        self
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    pub fn log_log(mut self) -> Self {
        self.log_log = true;
        self
    }

    /// Map a data point into plotting coordinates (log10 on log-log charts).
    ///
    /// Returns `None` for points a log axis cannot show.
    pub fn project(&self, (x, y): (f64, f64)) -> Option<(f64, f64)> {
        if self.log_log {
            (x > 0.0 && y > 0.0).then(|| (x.log10(), y.log10()))
        } else {
            Some((x, y))
        }
    }

    /// Series with every point projected.
    pub fn projected_series(&self) -> Vec<Series> {
        self.series
            .iter()
            .map(|s| Series {
                label: s.label.clone(),
                kind: s.kind,
                points: s.points.iter().filter_map(|&p| self.project(p)).collect(),
            })
            .collect()
    }

    /// `(x_min, x_max, y_min, y_max)` in plotting coordinates, widened when degenerate.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut x_min = f64::INFINITY;
        let mut x_max = f64::NEG_INFINITY;
        let mut y_min = f64::INFINITY;
        let mut y_max = f64::NEG_INFINITY;
        for s in self.projected_series() {
            for (x, y) in s.points {
                x_min = x_min.min(x);
                x_max = x_max.max(x);
                y_min = y_min.min(y);
                y_max = y_max.max(y);
            }
        }
        if !(x_min.is_finite() && y_min.is_finite()) {
            return None;
        }
        let (x_min, x_max) = widen(x_min, x_max);
        let (y_min, y_max) = widen(y_min, y_max);
        Some((x_min, x_max, y_min, y_max))
    }

    /// Axis label for an x value in plotting coordinates.
    pub fn format_x(&self, v: f64) -> String {
        if self.log_log {
            return format_count(10f64.powf(v));
        }
        match self.x_axis {
            XAxis::Dates { origin } => date_at(origin, v)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| format!("{v:.0}")),
            XAxis::Days => format!("{v:.0}"),
            XAxis::Linear => format_count(v),
        }
    }

    /// Axis label for a y value in plotting coordinates.
    pub fn format_y(&self, v: f64) -> String {
        if self.log_log {
            format_count(10f64.powf(v))
        } else {
            format_count(v)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }
}

fn widen(min: f64, max: f64) -> (f64, f64) {
    if max > min {
        (min, max)
    } else {
        let pad = (min.abs() * 0.05).max(0.5);
        (min - pad, max + pad)
    }
}

fn date_at(origin: NaiveDate, offset: f64) -> Option<NaiveDate> {
    let days = offset.round();
    if days >= 0.0 {
        origin.checked_add_days(Days::new(days as u64))
    } else {
        origin.checked_sub_days(Days::new((-days) as u64))
    }
}

/// Compact number formatting for tick labels (`1.2M`, `35k`, `0.05`).
pub fn format_count(v: f64) -> String {
    let a = v.abs();
    if a >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if a >= 1e4 {
        format!("{:.0}k", v / 1e3)
    } else if a >= 100.0 || v == v.trunc() {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

/// File-name-safe version of a chart title.
pub fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_sep = true;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_sep = false;
        } else if !last_sep {
            out.push('_');
            last_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Destination for rendered charts.
#[derive(Debug, Clone)]
pub struct ChartSink {
    out_dir: PathBuf,
    svg: bool,
    ascii: bool,
    width: usize,
    height: usize,
}

impl ChartSink {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            out_dir: config.out_dir.clone(),
            svg: config.svg,
            ascii: config.ascii,
            width: config.width,
            height: config.height,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Render `chart`: print it to stdout when ASCII output is on and write
    /// `<out_dir>/<name>.svg` when SVG output is on. Returns the SVG path.
    pub fn emit(&self, chart: &Chart, name: &str) -> Result<Option<PathBuf>, AppError> {
        if chart.is_empty() {
            log::warn!("chart '{}' has no finite points; skipping", chart.title);
            return Ok(None);
        }
        if self.ascii {
            println!("{}", render_ascii(chart, self.width, self.height));
        }
        if !self.svg {
            return Ok(None);
        }

        std::fs::create_dir_all(&self.out_dir).map_err(|e| {
            AppError::input(format!("Failed to create output directory {}: {e}", self.out_dir.display()))
        })?;
        let path = self.out_dir.join(format!("{}.svg", slug(name)));
        render_svg(chart, &path, SVG_WIDTH, SVG_HEIGHT)?;
        log::info!("wrote {}", path.display());
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_drop_non_finite_points() {
        let s = Series::line("x", [(0.0, 1.0), (1.0, f64::NAN), (2.0, f64::INFINITY), (3.0, 2.0)]);
        assert_eq!(s.points, vec![(0.0, 1.0), (3.0, 2.0)]);
    }

    #[test]
    fn log_log_projection_skips_non_positive() {
        let chart = Chart::new("t", XAxis::Linear)
            .log_log()
            .with_series(Series::points("p", [(10.0, 100.0), (0.0, 5.0)]));
        let projected = chart.projected_series();
        assert_eq!(projected[0].points, vec![(1.0, 2.0)]);
        assert_eq!(chart.format_x(1.0), "10");
    }

    #[test]
    fn date_axis_labels() {
        let origin = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let chart = Chart::new("t", XAxis::Dates { origin });
        assert_eq!(chart.format_x(3.0), "2020-03-04");
    }

    #[test]
    fn bounds_widen_flat_series() {
        let chart = Chart::new("t", XAxis::Days).with_series(Series::line("a", [(0.0, 5.0), (4.0, 5.0)]));
        let (x0, x1, y0, y1) = chart.bounds().unwrap();
        assert_eq!((x0, x1), (0.0, 4.0));
        assert!(y0 < 5.0 && y1 > 5.0);
    }

    #[test]
    fn slug_is_file_safe() {
        assert_eq!(slug("Covid-19 death rate: Korea, South"), "covid_19_death_rate_korea_south");
    }

    #[test]
    fn counts_format_compactly() {
        assert_eq!(format_count(12_000_000.0), "12.0M");
        assert_eq!(format_count(35_400.0), "35k");
        assert_eq!(format_count(250.0), "250");
        assert_eq!(format_count(0.05), "0.05");
    }
}

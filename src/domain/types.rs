//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during metric computation and model fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// An ordered daily series: one value per calendar day, dates strictly increasing.
///
/// Dates and values are stored as parallel vectors because every formula in
/// the metrics layer works on the value slice alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self, AppError> {
        if dates.len() != values.len() {
            return Err(AppError::data(format!(
                "Series length mismatch: {} dates vs {} values.",
                dates.len(),
                values.len()
            )));
        }
        if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(AppError::data(format!(
                "Series dates must be strictly increasing ({} is followed by {}).",
                w[0], w[1]
            )));
        }
        Ok(Self { dates, values })
    }

    /// A series with the same date index and new values.
    ///
    /// # Panics
    /// Panics if `values` does not have the same length as the date index.
    /// Metric formulas always map one input slot to one output slot.
    pub fn with_values(&self, values: Vec<f64>) -> Self {
        assert_eq!(values.len(), self.dates.len(), "derived metric must keep the date index");
        Self {
            dates: self.dates.clone(),
            values,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Keep only the observations within `[from, to]` (either bound optional).
    pub fn slice_dates(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        let (dates, values) = self
            .iter()
            .filter(|(d, _)| from.is_none_or(|f| *d >= f) && to.is_none_or(|t| *d <= t))
            .unzip();
        Self { dates, values }
    }
}

/// Which CSSE table a series comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseKind {
    Confirmed,
    Deaths,
    Recovered,
}

impl CaseKind {
    pub const ALL: [CaseKind; 3] = [CaseKind::Confirmed, CaseKind::Deaths, CaseKind::Recovered];

    /// File name of the global time-series table for this kind.
    pub fn file_name(self) -> &'static str {
        match self {
            CaseKind::Confirmed => "time_series_covid19_confirmed_global.csv",
            CaseKind::Deaths => "time_series_covid19_deaths_global.csv",
            CaseKind::Recovered => "time_series_covid19_recovered_global.csv",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            CaseKind::Confirmed => "confirmed",
            CaseKind::Deaths => "deaths",
            CaseKind::Recovered => "recovered",
        }
    }
}

/// Cumulative confirmed/deaths/recovered counts for one country, aligned by date.
#[derive(Debug, Clone)]
pub struct CountrySeries {
    pub country: String,
    pub confirmed: TimeSeries,
    pub deaths: TimeSeries,
    pub recovered: TimeSeries,
}

impl CountrySeries {
    pub fn new(
        country: impl Into<String>,
        confirmed: TimeSeries,
        deaths: TimeSeries,
        recovered: TimeSeries,
    ) -> Result<Self, AppError> {
        let country = country.into();
        for (kind, series) in [(CaseKind::Deaths, &deaths), (CaseKind::Recovered, &recovered)] {
            if series.dates() != confirmed.dates() {
                return Err(AppError::data(format!(
                    "{country}: {} dates are not aligned with confirmed dates ({} vs {} days).",
                    kind.display_name(),
                    series.len(),
                    confirmed.len()
                )));
            }
        }
        Ok(Self {
            country,
            confirmed,
            deaths,
            recovered,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        self.confirmed.dates()
    }

    pub fn len(&self) -> usize {
        self.confirmed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty()
    }
}

/// Derived metrics that can be smoothed/plotted individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    DeathRate,
    RecoveryRate,
    NewCases,
    DailyGrowth,
    GrowthFactor,
    EstimatedInfected,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        MetricKind::DeathRate,
        MetricKind::RecoveryRate,
        MetricKind::NewCases,
        MetricKind::DailyGrowth,
        MetricKind::GrowthFactor,
        MetricKind::EstimatedInfected,
    ];

    /// Column name used in exports.
    pub fn column(self) -> &'static str {
        match self {
            MetricKind::DeathRate => "death_rate",
            MetricKind::RecoveryRate => "recovery_rate",
            MetricKind::NewCases => "new_cases",
            MetricKind::DailyGrowth => "daily_growth",
            MetricKind::GrowthFactor => "growth_factor",
            MetricKind::EstimatedInfected => "estimated_infected",
        }
    }

    /// Chart title.
    pub fn title(self) -> &'static str {
        match self {
            MetricKind::DeathRate => "Covid-19 death rate",
            MetricKind::RecoveryRate => "Covid-19 recovery rate",
            MetricKind::NewCases => "Covid-19 new cases",
            MetricKind::DailyGrowth => "Covid-19 daily growth",
            MetricKind::GrowthFactor => "Growth factor of Covid-19",
            MetricKind::EstimatedInfected => "Estimated number of Covid-19 infections",
        }
    }
}

/// Parameters of the four-parameter logistic curve
/// `f(x) = (a - d) / (1 + (x / c)^b) + d`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Left asymptote (value at `x = 0` for `b > 0`).
    pub a: f64,
    /// Steepness at the inflection point.
    pub b: f64,
    /// Inflection x-value (day index).
    pub c: f64,
    /// Right asymptote.
    pub d: f64,
}

impl LogisticParams {
    pub fn to_array(self) -> [f64; 4] {
        [self.a, self.b, self.c, self.d]
    }

    /// # Panics
    /// Panics if `p` has fewer than four elements.
    pub fn from_slice(p: &[f64]) -> Self {
        Self {
            a: p[0],
            b: p[1],
            c: p[2],
            d: p[3],
        }
    }
}

impl Default for LogisticParams {
    /// The conventional starting guess `(0, 1, 1, 1)`.
    fn default() -> Self {
        Self {
            a: 0.0,
            b: 1.0,
            c: 1.0,
            d: 1.0,
        }
    }
}

/// How the least-squares solver stopped.
///
/// Informational only: a poor fit is still returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    /// Relative reduction of the residual sum of squares fell below `ftol`.
    ResidualConverged,
    /// Relative parameter step fell below `xtol`.
    StepConverged,
    /// Residuals are exactly zero.
    ExactFit,
    /// Function-evaluation budget exhausted.
    MaxEvaluations,
    /// No improving step could be found (damping blew up).
    Stalled,
}

impl FitStatus {
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            FitStatus::ResidualConverged | FitStatus::StepConverged | FitStatus::ExactFit
        )
    }

    pub fn display_name(self) -> &'static str {
        match self {
            FitStatus::ResidualConverged => "converged (residual tolerance)",
            FitStatus::StepConverged => "converged (step tolerance)",
            FitStatus::ExactFit => "converged (exact fit)",
            FitStatus::MaxEvaluations => "stopped: evaluation budget exhausted",
            FitStatus::Stalled => "stopped: no improving step",
        }
    }
}

/// A fitted logistic curve and its projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticFit {
    pub country: String,
    pub initial: LogisticParams,
    pub params: LogisticParams,
    pub status: FitStatus,
    /// Residual sum of squares at the returned parameters.
    pub rss: f64,
    pub evaluations: usize,
    /// The data the curve was fitted to (x = day index from the first date).
    pub observed: TimeSeries,
    /// `f(x)` for `x = 0 .. 2 * observed.len() - 1`, dated from the first observation.
    pub projection: TimeSeries,
}

/// Inputs of one SIR simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SirParams {
    /// Total population `N`.
    pub population: f64,
    /// Initial infected count `I0`.
    pub infected: f64,
    /// Initial recovered count `R0`.
    pub recovered: f64,
    /// Contact rate β (per day).
    pub beta: f64,
    /// Recovery rate γ (per day).
    pub gamma: f64,
    /// Number of grid points spanning `[0, horizon_days]`.
    pub horizon_days: usize,
}

/// Susceptible/infected/recovered counts at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SirState {
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
}

impl SirState {
    pub fn total(&self) -> f64 {
        self.susceptible + self.infected + self.recovered
    }
}

/// Output of one SIR simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SirTrajectory {
    pub params: SirParams,
    /// Time grid in days.
    pub t: Vec<f64>,
    pub susceptible: Vec<f64>,
    pub infected: Vec<f64>,
    pub recovered: Vec<f64>,
}

impl SirTrajectory {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn state(&self, k: usize) -> SirState {
        SirState {
            susceptible: self.susceptible[k],
            infected: self.infected[k],
            recovered: self.recovered[k],
        }
    }

    /// Grid time and value of the largest infected count (first one on ties).
    pub fn peak_infected(&self) -> Option<(f64, f64)> {
        let mut best: Option<(f64, f64)> = None;
        for (&t, &i) in self.t.iter().zip(self.infected.iter()) {
            if best.is_none_or(|(_, v)| i > v) {
                best = Some((t, i));
            }
        }
        best
    }
}

/// Where the CSSE tables come from.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// Download from `<base_url>/<file name>`.
    Remote { base_url: String },
    /// Read `<dir>/<file name>`.
    Local { dir: PathBuf },
    /// Generate deterministic synthetic tables.
    Synthetic { seed: u64, days: usize },
}

/// Derived-metrics settings.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Metrics to pass through the Savitzky–Golay smoother.
    pub smoothed: Vec<MetricKind>,
    /// Assumed growth rate `g` used to scale estimated infections.
    pub growth_rate: f64,
    /// Death-lag shift window `j` (days).
    pub shift_days: usize,
}

impl Default for MetricsConfig {
    /// Estimated infections are smoothed; every other metric is left raw.
    fn default() -> Self {
        Self {
            smoothed: vec![MetricKind::EstimatedInfected],
            growth_rate: 14.0,
            shift_days: 1,
        }
    }
}

impl MetricsConfig {
    pub fn is_smoothed(&self, kind: MetricKind) -> bool {
        self.smoothed.contains(&kind)
    }
}

/// SIR driver settings.
#[derive(Debug, Clone)]
pub struct SirConfig {
    pub population: f64,
    pub beta: f64,
    pub gamma: f64,
    pub horizon_days: usize,
    /// Number of trailing observed days used to seed sensitivity runs.
    pub last_days: usize,
}

impl Default for SirConfig {
    fn default() -> Self {
        Self {
            population: 12_000_000.0,
            beta: 0.2,
            gamma: 1.0 / 21.0,
            horizon_days: 120,
            last_days: 7,
        }
    }
}

/// Where and how charts are rendered.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub out_dir: PathBuf,
    pub svg: bool,
    pub ascii: bool,
    pub width: usize,
    pub height: usize,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus `.env` and defaults).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub source: DataSource,
    pub countries: Vec<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub metrics: MetricsConfig,
    pub logistic_guess: LogisticParams,
    /// Levenberg–Marquardt evaluation budget; `None` uses the solver default.
    pub max_evaluations: Option<usize>,
    pub sir: SirConfig,
    /// Snapshot date for the world comparison.
    pub world_date: NaiveDate,
    pub output: OutputConfig,
    /// Directory for CSV/JSON exports; nothing is exported when unset.
    pub export_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, n).unwrap()
    }

    #[test]
    fn time_series_rejects_unordered_dates() {
        let err = TimeSeries::new(vec![day(2), day(1)], vec![1.0, 2.0]).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_DATA);
    }

    #[test]
    fn time_series_slices_by_date() {
        let ts = TimeSeries::new(vec![day(1), day(2), day(3)], vec![1.0, 2.0, 3.0]).unwrap();
        let s = ts.slice_dates(Some(day(2)), None);
        assert_eq!(s.values(), &[2.0, 3.0]);
        assert_eq!(s.first_date(), Some(day(2)));
    }

    #[test]
    fn country_series_requires_aligned_dates() {
        let a = TimeSeries::new(vec![day(1), day(2)], vec![1.0, 2.0]).unwrap();
        let b = TimeSeries::new(vec![day(2), day(3)], vec![1.0, 2.0]).unwrap();
        assert!(CountrySeries::new("X", a.clone(), a.clone(), a.clone()).is_ok());
        assert!(CountrySeries::new("X", a.clone(), b, a).is_err());
    }

    #[test]
    fn peak_infected_picks_first_maximum() {
        let traj = SirTrajectory {
            params: SirParams {
                population: 10.0,
                infected: 1.0,
                recovered: 0.0,
                beta: 0.0,
                gamma: 0.0,
                horizon_days: 4,
            },
            t: vec![0.0, 1.0, 2.0, 3.0],
            susceptible: vec![9.0, 7.0, 7.0, 8.0],
            infected: vec![1.0, 3.0, 3.0, 2.0],
            recovered: vec![0.0, 0.0, 0.0, 0.0],
        };
        assert_eq!(traj.peak_infected(), Some((1.0, 3.0)));
    }
}

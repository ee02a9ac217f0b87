//! Command-line parsing for the epidemic curve analyser.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! metrics/modelling code. Every command resolves its flags into one
//! [`AnalysisConfig`] that the pipeline consumes.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::data::base_url_from_env;
use crate::domain::{
    AnalysisConfig, DataSource, LogisticParams, MetricKind, MetricsConfig, OutputConfig, SirConfig, SirParams,
};
use crate::error::AppError;
use crate::metrics::{DEFAULT_WORLD_COUNTRIES, DEFAULT_WORLD_DATE};

/// Country analysed when none is given.
pub const DEFAULT_COUNTRY: &str = "Germany";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "epi",
    version,
    about = "Epidemic curve analysis: derived metrics, logistic growth fits and SIR projections"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Death/recovery rates, new cases, growth and estimated infections per country.
    Metrics(MetricsArgs),
    /// Fit a 4-parameter logistic curve to cumulative confirmed cases.
    Logistic(LogisticArgs),
    /// Run SIR projections, either from explicit initial conditions or seeded
    /// from the last observed days of a country.
    Sir(SirArgs),
    /// Compare confirmed cases and deaths across countries on one date.
    World(WorldArgs),
    /// Metrics, logistic fit and SIR projections for each country.
    Report(ReportArgs),
    /// Re-render a logistic fit saved with `--export-dir`.
    Plot(PlotArgs),
}

/// Where the data comes from and which slice of it to analyse.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Country/Region to analyse (repeatable).
    #[arg(short = 'c', long = "country", value_name = "NAME")]
    pub countries: Vec<String>,

    /// Read the three CSSE tables from this directory instead of downloading them.
    #[arg(long, value_name = "DIR", conflicts_with = "synthetic")]
    pub data_dir: Option<PathBuf>,

    /// Generate deterministic synthetic tables (no network access).
    #[arg(long)]
    pub synthetic: bool,

    /// Seed for synthetic tables.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of days in synthetic tables.
    #[arg(long, default_value_t = 120)]
    pub synthetic_days: usize,

    /// Base URL of the CSSE tables (defaults to EPI_DATA_BASE_URL or the public repository).
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// First date to analyse (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last date to analyse (YYYY-MM-DD).
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

/// Chart output.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Directory for SVG charts.
    #[arg(long, default_value = "out")]
    pub out_dir: PathBuf,

    /// Do not write SVG charts.
    #[arg(long)]
    pub no_svg: bool,

    /// Print ASCII charts to the terminal.
    #[arg(long)]
    pub ascii: bool,

    /// ASCII plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// ASCII plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Write CSV/JSON exports into this directory.
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,
}

/// Derived-metrics options.
#[derive(Debug, Args, Clone)]
pub struct MetricsOpts {
    /// Smooth this metric with a Savitzky-Golay filter (7, 3); repeatable.
    /// Estimated infections are always smoothed unless `--raw-estimate` is given.
    #[arg(long = "smooth", value_enum, value_name = "METRIC")]
    pub smooth: Vec<MetricKind>,

    /// Leave estimated infections unsmoothed.
    #[arg(long)]
    pub raw_estimate: bool,

    /// Assumed growth rate g for estimated infections.
    #[arg(long, default_value_t = 14.0)]
    pub growth_rate: f64,

    /// Death-lag shift j (days) for estimated infections.
    #[arg(long, default_value_t = 1)]
    pub shift_days: usize,
}

/// Logistic fit options.
#[derive(Debug, Args, Clone)]
pub struct FitOpts {
    /// Initial guess "a,b,c,d".
    #[arg(long, value_parser = parse_guess, allow_hyphen_values = true, default_value = "0,1,1,1")]
    pub guess: LogisticParams,

    /// Residual-evaluation budget for the solver (default 200 * (params + 1)).
    #[arg(long)]
    pub max_evaluations: Option<usize>,
}

/// SIR model constants.
#[derive(Debug, Args, Clone)]
pub struct SirOpts {
    /// Total population N.
    #[arg(long, default_value_t = 12_000_000.0)]
    pub population: f64,

    /// Contact rate beta (per day).
    #[arg(long, default_value_t = 0.2)]
    pub beta: f64,

    /// Recovery rate gamma (per day).
    #[arg(long, default_value_t = 1.0 / 21.0)]
    pub gamma: f64,

    /// Projection horizon (days).
    #[arg(long, default_value_t = 120)]
    pub days: usize,

    /// Number of trailing observed days that seed sensitivity runs.
    #[arg(long, default_value_t = 7)]
    pub last_days: usize,
}

#[derive(Debug, Args, Clone)]
pub struct MetricsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub output: OutputArgs,
    #[command(flatten)]
    pub metrics: MetricsOpts,
}

#[derive(Debug, Args, Clone)]
pub struct LogisticArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub output: OutputArgs,
    #[command(flatten)]
    pub fit: FitOpts,
}

#[derive(Debug, Args, Clone)]
pub struct SirArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub output: OutputArgs,
    #[command(flatten)]
    pub sir: SirOpts,

    /// Initial infected I0; runs one simulation without loading any data.
    #[arg(long)]
    pub infected: Option<f64>,

    /// Initial recovered R0 (with --infected).
    #[arg(long, requires = "infected", default_value_t = 0.0)]
    pub recovered: f64,
}

#[derive(Debug, Args, Clone)]
pub struct WorldArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub output: OutputArgs,

    /// Snapshot date (YYYY-MM-DD).
    #[arg(long, default_value = DEFAULT_WORLD_DATE)]
    pub date: NaiveDate,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub output: OutputArgs,
    #[command(flatten)]
    pub metrics: MetricsOpts,
    #[command(flatten)]
    pub fit: FitOpts,
    #[command(flatten)]
    pub sir: SirOpts,
}

#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Fit JSON file written by `epi logistic --export-dir`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,
    #[command(flatten)]
    pub output: OutputArgs,
}

/// Parse "a,b,c,d" into a logistic starting guess.
pub fn parse_guess(raw: &str) -> Result<LogisticParams, String> {
    let values = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid number '{}': {e}", part.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() != 4 {
        return Err(format!("expected 4 comma-separated values (a,b,c,d), got {}", values.len()));
    }
    Ok(LogisticParams::from_slice(&values))
}

impl SourceArgs {
    pub fn data_source(&self) -> DataSource {
        if self.synthetic {
            DataSource::Synthetic {
                seed: self.seed,
                days: self.synthetic_days,
            }
        } else if let Some(dir) = &self.data_dir {
            DataSource::Local { dir: dir.clone() }
        } else {
            DataSource::Remote {
                base_url: self.base_url.clone().unwrap_or_else(base_url_from_env),
            }
        }
    }

    /// Requested countries, or `defaults` when none were given.
    pub fn countries_or(&self, defaults: &[&str]) -> Vec<String> {
        if self.countries.is_empty() {
            defaults.iter().map(|s| s.to_string()).collect()
        } else {
            self.countries.clone()
        }
    }
}

impl OutputArgs {
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            out_dir: self.out_dir.clone(),
            svg: !self.no_svg,
            ascii: self.ascii,
            width: self.width,
            height: self.height,
        }
    }
}

impl MetricsOpts {
    pub fn metrics_config(&self) -> MetricsConfig {
        let mut smoothed = self.smooth.clone();
        let estimate = MetricKind::EstimatedInfected;
        if self.raw_estimate {
            smoothed.retain(|k| *k != estimate);
        } else if !smoothed.contains(&estimate) {
            smoothed.push(estimate);
        }
        MetricsConfig {
            smoothed,
            growth_rate: self.growth_rate,
            shift_days: self.shift_days,
        }
    }
}

impl SirOpts {
    pub fn sir_config(&self) -> SirConfig {
        SirConfig {
            population: self.population,
            beta: self.beta,
            gamma: self.gamma,
            horizon_days: self.days,
            last_days: self.last_days,
        }
    }
}

impl SirArgs {
    /// Explicit initial conditions, when `--infected` was given.
    pub fn explicit_params(&self) -> Option<SirParams> {
        self.infected.map(|infected| SirParams {
            population: self.sir.population,
            infected,
            recovered: self.recovered,
            beta: self.sir.beta,
            gamma: self.sir.gamma,
            horizon_days: self.sir.days,
        })
    }
}

/// Resolve shared flags into a pipeline configuration.
///
/// Options a command does not expose keep their defaults.
pub fn analysis_config(
    source: &SourceArgs,
    output: &OutputArgs,
    default_countries: &[&str],
) -> Result<AnalysisConfig, AppError> {
    if let (Some(from), Some(to)) = (source.from, source.to)
        && from > to
    {
        return Err(AppError::input(format!("--from {from} is after --to {to}.")));
    }
    if output.width == 0 || output.height == 0 {
        return Err(AppError::input("Plot width and height must be positive."));
    }

    Ok(AnalysisConfig {
        source: source.data_source(),
        countries: source.countries_or(default_countries),
        from: source.from,
        to: source.to,
        metrics: MetricsConfig::default(),
        logistic_guess: LogisticParams::default(),
        max_evaluations: None,
        sir: SirConfig::default(),
        world_date: default_world_date()?,
        output: output.output_config(),
        export_dir: output.export_dir.clone(),
    })
}

fn default_world_date() -> Result<NaiveDate, AppError> {
    DEFAULT_WORLD_DATE
        .parse()
        .map_err(|e| AppError::runtime(format!("Invalid default world date: {e}")))
}

impl Command {
    /// The pipeline configuration for data-driven commands (`None` for `plot`).
    pub fn analysis_config(&self) -> Result<Option<AnalysisConfig>, AppError> {
        let config = match self {
            Command::Metrics(a) => AnalysisConfig {
                metrics: a.metrics.metrics_config(),
                ..analysis_config(&a.source, &a.output, &[DEFAULT_COUNTRY])?
            },
            Command::Logistic(a) => AnalysisConfig {
                logistic_guess: a.fit.guess,
                max_evaluations: a.fit.max_evaluations,
                ..analysis_config(&a.source, &a.output, &[DEFAULT_COUNTRY])?
            },
            Command::Sir(a) => AnalysisConfig {
                sir: a.sir.sir_config(),
                ..analysis_config(&a.source, &a.output, &[DEFAULT_COUNTRY])?
            },
            Command::World(a) => AnalysisConfig {
                world_date: a.date,
                ..analysis_config(&a.source, &a.output, &DEFAULT_WORLD_COUNTRIES)?
            },
            Command::Report(a) => AnalysisConfig {
                metrics: a.metrics.metrics_config(),
                logistic_guess: a.fit.guess,
                max_evaluations: a.fit.max_evaluations,
                sir: a.sir.sir_config(),
                ..analysis_config(&a.source, &a.output, &[DEFAULT_COUNTRY])?
            },
            Command::Plot(_) => return Ok(None),
        };
        Ok(Some(config))
    }
}

//! Shared compute logic used by every command.
//!
//! The workflow is: load the three CSSE tables once -> extract each requested
//! country -> derive metrics / fit / simulate. Presentation (printing, charts,
//! exports) stays in `app`.
//!
//! Per-country work is independent, so batch helpers run it on the rayon pool
//! and return one `Result` per country in the requested order.

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::data::{CsseTables, load_tables};
use crate::domain::{AnalysisConfig, CountrySeries, LogisticFit, SirParams, SirTrajectory, TimeSeries};
use crate::error::AppError;
use crate::fit::fit_many;
use crate::math::LmOptions;
use crate::metrics::{MetricsTable, WorldPoint, compute_metrics, world_snapshot};
use crate::models::simulate_many;

/// One SIR run seeded from an observed day.
pub type SeededRun = (NaiveDate, SirTrajectory);

/// A seeded run, or why that seed was rejected.
pub type SeededResult = (NaiveDate, Result<SirTrajectory, AppError>);

/// Loaded tables plus the configuration they are analysed under.
#[derive(Debug)]
pub struct Pipeline {
    config: AnalysisConfig,
    tables: CsseTables,
}

impl Pipeline {
    /// Load the tables described by `config.source`.
    pub fn load(config: AnalysisConfig) -> Result<Self, AppError> {
        let tables = load_tables(&config.source, &config.countries)?;
        log::info!(
            "loaded CSSE tables: {} days ({} .. {})",
            tables.dates().len(),
            tables.dates().first().map(|d| d.to_string()).unwrap_or_default(),
            tables.dates().last().map(|d| d.to_string()).unwrap_or_default()
        );
        Ok(Self::with_tables(config, tables))
    }

    /// Use tables that were loaded elsewhere.
    pub fn with_tables(config: AnalysisConfig, tables: CsseTables) -> Self {
        Self { config, tables }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn countries(&self) -> &[String] {
        &self.config.countries
    }

    /// One country, restricted to the configured date range.
    pub fn country(&self, name: &str) -> Result<CountrySeries, AppError> {
        self.tables.country_between(name, self.config.from, self.config.to)
    }

    pub fn metrics_for(&self, name: &str) -> Result<MetricsTable, AppError> {
        let series = self.country(name)?;
        compute_metrics(&series, &self.config.metrics).map_err(|e| e.context(name))
    }

    pub fn metrics(&self) -> Vec<Result<MetricsTable, AppError>> {
        self.countries().par_iter().map(|c| self.metrics_for(c)).collect()
    }

    pub fn lm_options(&self) -> LmOptions {
        LmOptions {
            max_evaluations: self.config.max_evaluations,
            ..LmOptions::default()
        }
    }

    /// Cumulative confirmed cases, the series the logistic curve is fitted to.
    pub fn logistic_input(&self, name: &str) -> Result<TimeSeries, AppError> {
        Ok(self.country(name)?.confirmed)
    }

    /// Fit every country; a country whose series cannot be extracted fails on its own.
    pub fn logistic(&self) -> Vec<Result<LogisticFit, AppError>> {
        let inputs: Vec<Result<TimeSeries, AppError>> = self.countries().iter().map(|c| self.logistic_input(c)).collect();
        let extracted: Vec<(String, TimeSeries)> = self
            .countries()
            .iter()
            .zip(&inputs)
            .filter_map(|(c, input)| input.as_ref().ok().map(|s| (c.clone(), s.clone())))
            .collect();
        let mut fits = fit_many(&extracted, self.config.logistic_guess, &self.lm_options()).into_iter();

        inputs
            .into_iter()
            .map(|input| match input {
                Ok(_) => fits
                    .next()
                    .unwrap_or_else(|| Err(AppError::runtime("Logistic fit batch returned too few results."))),
                Err(e) => Err(e),
            })
            .collect()
    }

    /// SIR parameters seeded from each of the last `last_days` observations:
    /// `I0` = cumulative confirmed and `R0` = cumulative recovered on that day.
    pub fn sir_seeds(&self, name: &str) -> Result<Vec<(NaiveDate, SirParams)>, AppError> {
        let series = self.country(name)?;
        let sir = &self.config.sir;
        if sir.last_days == 0 {
            return Err(AppError::input("--last-days must be at least 1."));
        }
        let start = series.len().saturating_sub(sir.last_days);

        Ok((start..series.len())
            .map(|k| {
                (
                    series.dates()[k],
                    SirParams {
                        population: sir.population,
                        infected: series.confirmed.values()[k],
                        recovered: series.recovered.values()[k],
                        beta: sir.beta,
                        gamma: sir.gamma,
                        horizon_days: sir.horizon_days,
                    },
                )
            })
            .collect())
    }

    /// Sensitivity runs over the last observed days, oldest first.
    ///
    /// Each run stands alone: a rejected seed (e.g. `I0 + R0 > N`) yields an
    /// error for that date only.
    pub fn sir_fan(&self, name: &str) -> Result<Vec<SeededResult>, AppError> {
        let seeds = self.sir_seeds(name)?;
        let params: Vec<SirParams> = seeds.iter().map(|(_, p)| *p).collect();

        Ok(seeds
            .iter()
            .zip(simulate_many(&params))
            .map(|((date, _), run)| (*date, run.map_err(|e| e.context(format!("{name} (seeded {date})")))))
            .collect())
    }

    pub fn world_point(&self, name: &str) -> Result<WorldPoint, AppError> {
        let series = self.tables.country(name)?;
        let mut points = world_snapshot(std::slice::from_ref(&series), self.config.world_date)?;
        points
            .pop()
            .ok_or_else(|| AppError::data(format!("{name}: empty world snapshot.")))
    }

    pub fn world(&self) -> Vec<Result<WorldPoint, AppError>> {
        self.countries().par_iter().map(|c| self.world_point(c)).collect()
    }
}

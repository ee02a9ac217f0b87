//! Read/write logistic fit JSON files.
//!
//! A fit file is the portable representation of one logistic fit:
//! - country, starting guess and fitted parameters
//! - solver outcome, residual sum of squares and evaluation count
//! - the observed series and the dated projection, for re-plotting
//!
//! Non-finite values are stored as `null`.

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{FitStatus, LogisticFit, LogisticParams, TimeSeries};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub country: String,
    pub initial: LogisticParams,
    pub params: LogisticParams,
    pub status: FitStatus,
    pub rss: f64,
    pub evaluations: usize,
    pub observed: Vec<DatedValue>,
    pub projection: Vec<DatedValue>,
}

impl FitFile {
    pub fn from_fit(fit: &LogisticFit) -> Self {
        Self {
            tool: "epi".to_string(),
            country: fit.country.clone(),
            initial: fit.initial,
            params: fit.params,
            status: fit.status,
            rss: fit.rss,
            evaluations: fit.evaluations,
            observed: to_dated(&fit.observed),
            projection: to_dated(&fit.projection),
        }
    }

    /// Rebuild the in-memory fit; date ordering is re-validated.
    pub fn into_fit(self) -> Result<LogisticFit, AppError> {
        Ok(LogisticFit {
            observed: from_dated(&self.observed).map_err(|e| e.context("observed"))?,
            projection: from_dated(&self.projection).map_err(|e| e.context("projection"))?,
            country: self.country,
            initial: self.initial,
            params: self.params,
            status: self.status,
            rss: self.rss,
            evaluations: self.evaluations,
        })
    }
}

fn to_dated(series: &TimeSeries) -> Vec<DatedValue> {
    series
        .iter()
        .map(|(date, v)| DatedValue {
            date,
            value: v.is_finite().then_some(v),
        })
        .collect()
}

fn from_dated(values: &[DatedValue]) -> Result<TimeSeries, AppError> {
    TimeSeries::new(
        values.iter().map(|d| d.date).collect(),
        values.iter().map(|d| d.value.unwrap_or(f64::NAN)).collect(),
    )
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, fit: &LogisticFit) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::input(format!("Failed to create directory '{}': {e}", parent.display())))?;
    }
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create fit JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, &FitFile::from_fit(fit))
        .map_err(|e| AppError::input(format!("Failed to write fit JSON: {e}")))?;

    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<LogisticFit, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let parsed: FitFile =
        serde_json::from_reader(file).map_err(|e| AppError::input(format!("Invalid fit JSON: {e}")))?;
    parsed.into_fit().map_err(|e| e.context(path.display()))
}

#[cfg(test)]
mod tests {
    use chrono::Days;

    use super::*;

    fn fit() -> LogisticFit {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let dates = |n: u64| (0..n).map(|k| start + Days::new(k)).collect::<Vec<_>>();
        LogisticFit {
            country: "Tunisia".to_string(),
            initial: LogisticParams::default(),
            params: LogisticParams {
                a: 1.0,
                b: 2.0,
                c: 3.0,
                d: 4.0,
            },
            status: FitStatus::ResidualConverged,
            rss: 0.5,
            evaluations: 42,
            observed: TimeSeries::new(dates(2), vec![1.0, 2.0]).unwrap(),
            projection: TimeSeries::new(dates(4), vec![1.0, 2.0, 3.0, f64::NAN]).unwrap(),
        }
    }

    #[test]
    fn fit_file_survives_disk_and_keeps_nan_slots() {
        let dir = std::env::temp_dir().join(format!("epi-curves-fit-{}", std::process::id()));
        let path = dir.join("fit.json");
        write_fit_json(&path, &fit()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"status\": \"residual_converged\""));
        assert!(text.contains("null"));

        let back = read_fit_json(&path).unwrap();
        assert_eq!(back.params, fit().params);
        assert_eq!(back.observed, fit().observed);
        assert_eq!(back.projection.len(), 4);
        assert!(back.projection.values()[3].is_nan());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unordered_dates_are_rejected_on_read() {
        let mut file = FitFile::from_fit(&fit());
        file.observed.swap(0, 1);
        assert!(file.into_fit().is_err());
    }
}

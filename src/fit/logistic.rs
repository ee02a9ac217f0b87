//! Logistic growth fitting for cumulative counts.
//!
//! Given cumulative values `y_i` observed on consecutive days, we fit
//! `f(x) = (a - d) / (1 + (x / c)^b) + d` with `x_i = i` (day index from the
//! first observation) and project the curve over twice the observed window.

use chrono::Days;
use rayon::prelude::*;

use crate::domain::{LogisticFit, LogisticParams, TimeSeries};
use crate::error::AppError;
use crate::math::{LmOptions, LmReport, levenberg_marquardt};
use crate::models::{project, residuals};

/// Fit the 4PL curve to `(x, y)` starting from `initial`.
///
/// Rejects a non-finite guess and `c == 0` (the curve is undefined at the
/// origin there). Non-convergence is not an error; see [`LmReport::status`].
pub fn fit_logistic(x: &[f64], y: &[f64], initial: LogisticParams, opts: &LmOptions) -> Result<LmReport, AppError> {
    if x.len() != y.len() {
        return Err(AppError::data(format!(
            "Logistic fit needs as many x as y values ({} vs {}).",
            x.len(),
            y.len()
        )));
    }
    if initial.to_array().iter().any(|v| !v.is_finite()) {
        return Err(AppError::input(format!("Logistic initial guess must be finite (got {initial:?}).")));
    }
    if initial.c == 0.0 {
        return Err(AppError::input("Logistic initial guess has c = 0; the curve is undefined at x = 0."));
    }

    levenberg_marquardt(
        |p: &[f64]| residuals(&LogisticParams::from_slice(p), x, y),
        &initial.to_array(),
        opts,
    )
}

/// Fit a cumulative daily series and build the dated projection.
pub fn fit_cumulative_series(
    country: &str,
    series: &TimeSeries,
    initial: LogisticParams,
    opts: &LmOptions,
) -> Result<LogisticFit, AppError> {
    let Some(start) = series.first_date() else {
        return Err(AppError::data(format!("{country}: no observations to fit.")));
    };
    if series.len() < 4 {
        return Err(AppError::data(format!(
            "{country}: a 4-parameter fit needs at least 4 observations (got {}).",
            series.len()
        )));
    }

    let x: Vec<f64> = (0..series.len()).map(|i| i as f64).collect();
    let report = fit_logistic(&x, series.values(), initial, opts).map_err(|e| e.context(country))?;
    let params = LogisticParams::from_slice(&report.params);

    if report.status.is_converged() {
        log::debug!(
            "{country}: logistic fit {} (rss={:.4e}, {} evaluations)",
            report.status.display_name(),
            report.cost,
            report.evaluations
        );
    } else {
        log::warn!(
            "{country}: logistic fit {} (rss={:.4e}, {} evaluations)",
            report.status.display_name(),
            report.cost,
            report.evaluations
        );
    }

    let values = project(&params, series.len());
    let dates = (0..values.len())
        .map(|k| {
            start
                .checked_add_days(Days::new(k as u64))
                .ok_or_else(|| AppError::data(format!("{country}: projection runs past the calendar.")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LogisticFit {
        country: country.to_string(),
        initial,
        params,
        status: report.status,
        rss: report.cost,
        evaluations: report.evaluations,
        observed: series.clone(),
        projection: TimeSeries::new(dates, values)?,
    })
}

/// Fit several countries in parallel; results keep the input order.
pub fn fit_many(
    inputs: &[(String, TimeSeries)],
    initial: LogisticParams,
    opts: &LmOptions,
) -> Vec<Result<LogisticFit, AppError>> {
    inputs
        .par_iter()
        .map(|(country, series)| fit_cumulative_series(country, series, initial, opts))
        .collect()
}

//! Derived metrics over one country's cumulative counts.
//!
//! - `rates`: death/recovery rates, new cases, daily growth, growth factor
//! - `estimate`: estimated true infections from deaths
//! - `world`: one-day cross-country snapshot

pub mod estimate;
pub mod rates;
pub mod world;

pub use estimate::*;
pub use rates::*;
pub use world::*;

use chrono::NaiveDate;

use crate::domain::{CountrySeries, MetricKind, MetricsConfig, TimeSeries};
use crate::error::AppError;
use crate::math::{SavitzkyGolay, clamp_all_non_negative, zero_non_finite};

/// Savitzky–Golay window used for every smoothed metric.
pub const SMOOTH_WINDOW: usize = 7;
/// Savitzky–Golay polynomial order used for every smoothed metric.
pub const SMOOTH_ORDER: usize = 3;

/// Every derived metric for one country, aligned with its input dates.
#[derive(Debug, Clone)]
pub struct MetricsTable {
    pub country: String,
    pub base: CountrySeries,
    /// One series per [`MetricKind::ALL`] entry, in that order.
    metrics: Vec<TimeSeries>,
    smoothed: Vec<MetricKind>,
}

impl MetricsTable {
    pub fn dates(&self) -> &[NaiveDate] {
        self.base.dates()
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    pub fn metric(&self, kind: MetricKind) -> &TimeSeries {
        let idx = MetricKind::ALL.iter().position(|k| *k == kind).unwrap_or(0);
        &self.metrics[idx]
    }

    pub fn is_smoothed(&self, kind: MetricKind) -> bool {
        self.smoothed.contains(&kind)
    }

    /// `(kind, series)` in [`MetricKind::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (MetricKind, &TimeSeries)> + '_ {
        MetricKind::ALL.iter().copied().zip(self.metrics.iter())
    }
}

/// Compute all metrics for `series`, smoothing the kinds listed in `config`.
pub fn compute_metrics(series: &CountrySeries, config: &MetricsConfig) -> Result<MetricsTable, AppError> {
    let c = series.confirmed.values();
    let d = series.deaths.values();
    let r = series.recovered.values();

    let nc = new_cases(c);
    let smoother = SavitzkyGolay::new(SMOOTH_WINDOW, SMOOTH_ORDER)?;
    if !config.smoothed.is_empty() && series.len() < SMOOTH_WINDOW {
        log::debug!(
            "{}: {} days is shorter than the smoothing window; leaving metrics unsmoothed",
            series.country,
            series.len()
        );
    }

    let metrics = MetricKind::ALL
        .iter()
        .map(|&kind| {
            let mut values = match kind {
                MetricKind::DeathRate => death_rate(c, d),
                MetricKind::RecoveryRate => recovery_rate(c, r),
                MetricKind::NewCases => nc.clone(),
                MetricKind::DailyGrowth => daily_growth(c, &nc),
                MetricKind::GrowthFactor => growth_factor(&nc),
                MetricKind::EstimatedInfected => estimated_infected(c, d, config.growth_rate, config.shift_days),
            };
            if config.is_smoothed(kind) {
                zero_non_finite(&mut values);
                values = smoother.apply(&values);
                clamp_all_non_negative(&mut values);
            }
            series.confirmed.with_values(values)
        })
        .collect();

    Ok(MetricsTable {
        country: series.country.clone(),
        base: series.clone(),
        metrics,
        smoothed: config.smoothed.clone(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::Days;

    use super::*;

    fn country(confirmed: &[f64], deaths: &[f64], recovered: &[f64]) -> CountrySeries {
        let start = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..confirmed.len()).map(|k| start + Days::new(k as u64)).collect();
        let ts = |v: &[f64]| TimeSeries::new(dates.clone(), v.to_vec()).unwrap();
        CountrySeries::new("Testland", ts(confirmed), ts(deaths), ts(recovered)).unwrap()
    }

    #[test]
    fn metrics_keep_date_alignment() {
        let s = country(&[0.0, 5.0, 10.0], &[0.0, 0.0, 1.0], &[0.0, 1.0, 2.0]);
        let table = compute_metrics(&s, &MetricsConfig::default()).unwrap();
        for (_, m) in table.iter() {
            assert_eq!(m.dates(), s.dates());
        }
        assert_eq!(table.metric(MetricKind::NewCases).values(), &[0.0, 5.0, 5.0]);
        assert_eq!(table.metric(MetricKind::DeathRate).values(), &[0.0, 0.0, 0.1]);
    }

    #[test]
    fn smoothing_only_touches_requested_metrics() {
        let confirmed: Vec<f64> = (0..20).map(|k| (k * k) as f64 + if k % 2 == 0 { 3.0 } else { 0.0 }).collect();
        let deaths: Vec<f64> = confirmed.iter().map(|c| (c / 50.0).floor()).collect();
        let recovered: Vec<f64> = confirmed.iter().map(|c| (c / 4.0).floor()).collect();
        let s = country(&confirmed, &deaths, &recovered);

        let plain = compute_metrics(&s, &MetricsConfig::default()).unwrap();
        let config = MetricsConfig {
            smoothed: vec![MetricKind::NewCases],
            ..MetricsConfig::default()
        };
        let smooth = compute_metrics(&s, &config).unwrap();

        assert!(smooth.is_smoothed(MetricKind::NewCases));
        assert_ne!(
            smooth.metric(MetricKind::NewCases).values(),
            plain.metric(MetricKind::NewCases).values()
        );
        assert_eq!(
            smooth.metric(MetricKind::GrowthFactor).values(),
            plain.metric(MetricKind::GrowthFactor).values()
        );
        assert!(smooth.metric(MetricKind::NewCases).values().iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn metrics_are_defined_and_non_negative() {
        let s = country(&[0.0, 0.0, 2.0, 2.0, 7.0], &[0.0, 0.0, 0.0, 1.0, 1.0], &[0.0; 5]);
        let table = compute_metrics(&s, &MetricsConfig::default()).unwrap();
        for (kind, m) in table.iter() {
            assert!(m.values().iter().all(|v| !v.is_nan() && *v >= 0.0), "{kind:?}");
        }
    }

    #[test]
    fn smoothing_an_unbounded_death_rate_stays_finite() {
        // Deaths reported on days with zero confirmed cases give death_rate = +inf.
        let confirmed = [0.0, 0.0, 3.0, 5.0, 8.0, 12.0, 15.0, 20.0, 26.0, 30.0];
        let deaths = [0.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0];
        let s = country(&confirmed, &deaths, &[0.0; 10]);

        let raw = compute_metrics(&s, &MetricsConfig::default()).unwrap();
        assert_eq!(raw.metric(MetricKind::DeathRate).values()[1], f64::INFINITY);

        let config = MetricsConfig {
            smoothed: vec![MetricKind::DeathRate],
            ..MetricsConfig::default()
        };
        let table = compute_metrics(&s, &config).unwrap();
        let values = table.metric(MetricKind::DeathRate).values();
        assert!(values.iter().all(|v| v.is_finite() && *v >= 0.0), "{values:?}");
    }
}

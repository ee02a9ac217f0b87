//! Deterministic synthetic CSSE tables for offline runs.
//!
//! Each country gets a logistic-shaped cumulative case curve with
//! multiplicative noise on the daily increments. Deaths and recoveries are
//! lagged fractions of the confirmed curve. Everything is seeded, so the same
//! seed and country list always produce the same tables.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{Days, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::reshape::{CsseTables, WideRow, WideTable};
use crate::domain::{CaseKind, LogisticParams};
use crate::error::AppError;
use crate::models::logistic4;

/// First date of the CSSE tables.
pub const FIRST_DATE: (i32, u32, u32) = (2020, 1, 22);

const DEATH_LAG_DAYS: usize = 7;
const RECOVERY_LAG_DAYS: usize = 14;
const INCREMENT_NOISE: f64 = 0.15;

#[derive(Debug, Clone)]
struct CountryCurves {
    confirmed: Vec<f64>,
    deaths: Vec<f64>,
    recovered: Vec<f64>,
}

pub fn synthetic_tables(countries: &[String], seed: u64, days: usize) -> Result<CsseTables, AppError> {
    if countries.is_empty() {
        return Err(AppError::input("Synthetic data needs at least one country."));
    }
    if days == 0 {
        return Err(AppError::input("Synthetic data needs at least one day."));
    }

    let (y, m, d) = FIRST_DATE;
    let start = NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| AppError::runtime("Invalid start date."))?;
    let dates = (0..days)
        .map(|k| {
            start
                .checked_add_days(Days::new(k as u64))
                .ok_or_else(|| AppError::input(format!("{days} synthetic days run past the calendar.")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let normal = Normal::new(0.0, INCREMENT_NOISE)
        .map_err(|e| AppError::runtime(format!("Noise distribution error: {e}")))?;

    let curves: Vec<(String, CountryCurves)> = countries
        .iter()
        .map(|name| (name.clone(), country_curves(name, seed, days, &normal)))
        .collect();

    let table = |kind: CaseKind| -> WideTable {
        let rows = curves
            .iter()
            .map(|(name, c)| WideRow {
                province: None,
                country: name.clone(),
                values: match kind {
                    CaseKind::Confirmed => c.confirmed.clone(),
                    CaseKind::Deaths => c.deaths.clone(),
                    CaseKind::Recovered => c.recovered.clone(),
                },
            })
            .collect();
        WideTable {
            kind,
            dates: dates.clone(),
            rows,
            skipped: Vec::new(),
        }
    };

    log::info!(
        "generated synthetic tables for {} countries over {days} days (seed {seed})",
        countries.len()
    );

    CsseTables::new(
        table(CaseKind::Confirmed),
        table(CaseKind::Deaths),
        table(CaseKind::Recovered),
    )
}

fn country_curves(name: &str, seed: u64, days: usize, normal: &Normal<f64>) -> CountryCurves {
    let mut rng = StdRng::seed_from_u64(country_seed(name, seed));

    let params = LogisticParams {
        a: 0.0,
        b: rng.gen_range(3.0..6.0),
        c: rng.gen_range(0.35..0.65) * days as f64,
        d: rng.gen_range(20_000.0..200_000.0),
    };
    let cfr: f64 = rng.gen_range(0.01..0.08);
    let recovery_share: f64 = rng.gen_range(0.5..0.9);

    let mut confirmed = Vec::with_capacity(days);
    let mut prev_expected = 0.0;
    let mut total = 0.0;
    for k in 0..days {
        let expected = logistic4(k as f64, &params);
        let increment = (expected - prev_expected).max(0.0);
        prev_expected = expected;
        total += increment * normal.sample(&mut rng).exp();
        confirmed.push(total.round());
    }

    let lagged = |lag: usize, share: f64| -> Vec<f64> {
        (0..days)
            .map(|k| if k < lag { 0.0 } else { (share * confirmed[k - lag]).round() })
            .collect()
    };
    let deaths = lagged(DEATH_LAG_DAYS, cfr);
    let recovered = lagged(RECOVERY_LAG_DAYS, recovery_share);

    CountryCurves {
        confirmed,
        deaths,
        recovered,
    }
}

fn country_seed(name: &str, seed: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    seed.hash(&mut hasher);
    hasher.finish()
}

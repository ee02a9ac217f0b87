//! Per-day rate formulas over cumulative counts.
//!
//! Every function maps `n` input slots to `n` output slots, with the value
//! before the first day taken as `0`. Degenerate divisions go through
//! [`safe_divide`] and results are clamped to be non-negative.

use crate::math::{Fallback, clamp_non_negative, safe_divide};

/// `deaths[t] / confirmed[t]`; `0/0 → 0`.
pub fn death_rate(confirmed: &[f64], deaths: &[f64]) -> Vec<f64> {
    ratio(deaths, confirmed)
}

/// `recovered[t] / confirmed[t]`; `0/0 → 0`.
pub fn recovery_rate(confirmed: &[f64], recovered: &[f64]) -> Vec<f64> {
    ratio(recovered, confirmed)
}

fn ratio(num: &[f64], den: &[f64]) -> Vec<f64> {
    assert_eq!(num.len(), den.len(), "rate inputs must be aligned");
    num.iter()
        .zip(den.iter())
        .map(|(&n, &d)| clamp_non_negative(safe_divide(n, d, Fallback::NAN_TO_ZERO)))
        .collect()
}

/// `|C[t] - C[t-1]|` with `C[-1] = 0`.
pub fn new_cases(confirmed: &[f64]) -> Vec<f64> {
    let mut prev = 0.0;
    confirmed
        .iter()
        .map(|&c| {
            let v = (c - prev).abs();
            prev = c;
            v
        })
        .collect()
}

/// `new_cases[t] / C[t-1]`; `0/0 → 0`, `x/0 → new_cases[t]`.
pub fn daily_growth(confirmed: &[f64], new_cases: &[f64]) -> Vec<f64> {
    assert_eq!(confirmed.len(), new_cases.len(), "rate inputs must be aligned");
    let mut prev = 0.0;
    new_cases
        .iter()
        .zip(confirmed.iter())
        .map(|(&nc, &c)| {
            let v = clamp_non_negative(safe_divide(nc, prev, Fallback::nan_to_zero_inf_to(nc)));
            prev = c;
            v
        })
        .collect()
}

/// `new_cases[t] / new_cases[t-1]`; `0/0 → 0`, `x/0 → new_cases[t]`.
pub fn growth_factor(new_cases: &[f64]) -> Vec<f64> {
    let mut prev = 0.0;
    new_cases
        .iter()
        .map(|&nc| {
            let v = clamp_non_negative(safe_divide(nc, prev, Fallback::nan_to_zero_inf_to(nc)));
            prev = nc;
            v
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn death_rate_handles_empty_days() {
        let c = [0.0, 10.0, 20.0, 40.0];
        let d = [0.0, 0.0, 1.0, 4.0];
        assert_eq!(death_rate(&c, &d), vec![0.0, 0.0, 0.05, 0.1]);
    }

    #[test]
    fn rates_are_non_negative_and_defined() {
        let c = [0.0, 3.0, 5.0, 5.0, 9.0];
        let r = [0.0, 0.0, 2.0, -1.0, 3.0];
        let out = recovery_rate(&c, &r);
        assert!(out.iter().all(|v| !v.is_nan() && *v >= 0.0));
        assert_eq!(out[3], 0.0);
    }

    #[test]
    fn new_cases_starts_from_zero() {
        assert_eq!(new_cases(&[3.0, 5.0, 4.0, 10.0]), vec![3.0, 2.0, 1.0, 6.0]);
    }

    #[test]
    fn daily_growth_substitutes_division_by_zero() {
        let c = [0.0, 4.0, 6.0, 9.0];
        let nc = new_cases(&c);
        // t=0: 0/0, t=1: 4/0, t=2: 2/4, t=3: 3/6
        assert_eq!(daily_growth(&c, &nc), vec![0.0, 4.0, 0.5, 0.5]);
    }

    #[test]
    fn growth_factor_of_small_sequence() {
        assert_eq!(growth_factor(&[0.0, 5.0, 10.0]), vec![0.0, 5.0, 2.0]);
    }

    #[test]
    fn growth_factor_after_a_zero_day() {
        assert_eq!(growth_factor(&[4.0, 0.0, 3.0, 6.0]), vec![4.0, 0.0, 3.0, 2.0]);
    }
}

//! Estimated true infection count from deaths.
//!
//! Deaths lag infections: a death recorded today reflects a case infected
//! some time earlier, while the case count has kept growing. The estimate
//! back-computes cases from deaths through the case fatality rate, shifts the
//! result forward by `j` days and scales it by the growth `(1 + g)^j`
//! accumulated over that lag.

use crate::math::{Fallback, safe_divide};

/// Estimated infections per day.
///
/// - `cfr[t] = D[t] / C[t]` (`0/0 → 0`)
/// - `raw[t] = D[t] / cfr[t]` (`0/0 → 0`)
/// - shift forward by `shift_days`, filling the exposed leading slots with `1`
/// - multiply by `(1 + growth_rate)^shift_days`
pub fn estimated_infected(confirmed: &[f64], deaths: &[f64], growth_rate: f64, shift_days: usize) -> Vec<f64> {
    assert_eq!(confirmed.len(), deaths.len(), "estimate inputs must be aligned");
    let n = confirmed.len();

    let raw: Vec<f64> = confirmed
        .iter()
        .zip(deaths.iter())
        .map(|(&c, &d)| {
            let cfr = safe_divide(d, c, Fallback::NAN_TO_ZERO);
            safe_divide(d, cfr, Fallback::NAN_TO_ZERO)
        })
        .collect();

    let scale = (1.0 + growth_rate).powi(shift_days as i32);
    (0..n)
        .map(|t| {
            let shifted = if t < shift_days { 1.0 } else { raw[t - shift_days] };
            shifted * scale
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_shifts_and_scales() {
        let c = [10.0, 20.0, 40.0, 80.0];
        let d = [0.0, 1.0, 2.0, 4.0];
        let out = estimated_infected(&c, &d, 14.0, 1);
        // raw = [0, 20, 40, 80]; shifted = [1, 0, 20, 40]; × 15
        let expected = [15.0, 0.0, 300.0, 600.0];
        for (got, want) in out.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-9, "{got} vs {want}");
        }
    }

    #[test]
    fn zero_shift_keeps_alignment() {
        let c = [5.0, 10.0];
        let d = [1.0, 2.0];
        let out = estimated_infected(&c, &d, 3.0, 0);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 5.0).abs() < 1e-12);
        assert!((out[1] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn shift_longer_than_series_fills_everything() {
        let out = estimated_infected(&[1.0, 2.0], &[0.0, 0.0], 1.0, 5);
        assert_eq!(out, vec![32.0, 32.0]);
    }

    #[test]
    fn deaths_without_cases_yield_zero() {
        let out = estimated_infected(&[0.0, 0.0], &[0.0, 3.0], 0.0, 0);
        assert_eq!(out, vec![0.0, 0.0]);
    }
}

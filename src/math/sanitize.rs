//! Explicit substitution rules for degenerate arithmetic.
//!
//! The rate formulas divide cumulative counts by each other, so `0/0` and
//! `x/0` show up on the first days of every outbreak. Instead of letting NaN
//! and infinity leak into charts and then patching them up ad hoc, every
//! formula routes its divisions through [`safe_divide`] with a named
//! [`Fallback`] and clamps with [`clamp_non_negative`].
//!
//! Only `+∞` is substituted. `-∞` can only arise from a negative numerator and
//! is removed by the non-negative clamp that every formula applies last.

/// Replacement values for the two degenerate division outcomes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fallback {
    /// Used when the quotient is NaN (`0/0`).
    pub undefined: f64,
    /// Used when the quotient is `+∞` (`x/0` with `x > 0`).
    pub unbounded: f64,
}

impl Fallback {
    /// `0/0 → 0`; `x/0` stays `+∞`.
    pub const NAN_TO_ZERO: Fallback = Fallback {
        undefined: 0.0,
        unbounded: f64::INFINITY,
    };

    /// `0/0 → 0`; `x/0 → value`.
    pub fn nan_to_zero_inf_to(value: f64) -> Self {
        Self {
            undefined: 0.0,
            unbounded: value,
        }
    }
}

/// Divide, substituting degenerate quotients per `fallback`.
pub fn safe_divide(numerator: f64, denominator: f64, fallback: Fallback) -> f64 {
    let q = numerator / denominator;
    if q.is_nan() {
        fallback.undefined
    } else if q == f64::INFINITY {
        fallback.unbounded
    } else {
        q
    }
}

/// Replace negative values (including `-∞`) by `0`. NaN is left untouched.
pub fn clamp_non_negative(value: f64) -> f64 {
    if value < 0.0 { 0.0 } else { value }
}

/// Replace NaN and infinities by `0`.
///
/// Applied before smoothing: one infinite sample would otherwise turn the
/// whole filter window into NaN.
pub fn zero_non_finite(values: &mut [f64]) {
    for v in values.iter_mut() {
        if !v.is_finite() {
            *v = 0.0;
        }
    }
}

/// Element-wise [`clamp_non_negative`].
pub fn clamp_all_non_negative(values: &mut [f64]) {
    for v in values.iter_mut() {
        *v = clamp_non_negative(*v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_over_zero_uses_undefined_fallback() {
        assert_eq!(safe_divide(0.0, 0.0, Fallback::NAN_TO_ZERO), 0.0);
        assert_eq!(safe_divide(0.0, 0.0, Fallback::nan_to_zero_inf_to(7.0)), 0.0);
    }

    #[test]
    fn positive_over_zero_uses_unbounded_fallback() {
        assert_eq!(safe_divide(5.0, 0.0, Fallback::nan_to_zero_inf_to(5.0)), 5.0);
        assert_eq!(safe_divide(5.0, 0.0, Fallback::NAN_TO_ZERO), f64::INFINITY);
    }

    #[test]
    fn negative_over_zero_is_clamped_not_substituted() {
        let q = safe_divide(-3.0, 0.0, Fallback::nan_to_zero_inf_to(9.0));
        assert_eq!(q, f64::NEG_INFINITY);
        assert_eq!(clamp_non_negative(q), 0.0);
    }

    #[test]
    fn regular_division_passes_through() {
        assert_eq!(safe_divide(10.0, 4.0, Fallback::NAN_TO_ZERO), 2.5);
        assert_eq!(clamp_non_negative(-0.5), 0.0);
        assert_eq!(clamp_non_negative(0.5), 0.5);
    }

    #[test]
    fn non_finite_values_become_zero() {
        let mut v = [1.0, f64::INFINITY, f64::NAN, f64::NEG_INFINITY, 2.0];
        zero_non_finite(&mut v);
        assert_eq!(v, [1.0, 0.0, 0.0, 0.0, 2.0]);
    }
}

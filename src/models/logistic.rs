//! Four-parameter logistic curve.
//!
//! `f(x) = (a - d) / (1 + (x / c)^b) + d`
//!
//! For `b > 0` the curve starts at `a` (x = 0), passes its inflection point at
//! `x = c`, and approaches `d` as `x → ∞`. `c = 0` divides by zero; the
//! evaluation does not guard against it (NaN at the origin, a step to `d`
//! elsewhere).

use crate::domain::LogisticParams;

/// Evaluate the 4PL curve at `x`.
pub fn logistic4(x: f64, p: &LogisticParams) -> f64 {
    (p.a - p.d) / (1.0 + (x / p.c).powf(p.b)) + p.d
}

/// Residuals `y_i - f(x_i)`.
///
/// # Panics
/// Panics if `x` and `y` differ in length.
pub fn residuals(p: &LogisticParams, x: &[f64], y: &[f64]) -> Vec<f64> {
    assert_eq!(x.len(), y.len(), "x and y must have the same length");
    x.iter().zip(y.iter()).map(|(&xi, &yi)| yi - logistic4(xi, p)).collect()
}

/// Residual sum of squares.
pub fn rss(p: &LogisticParams, x: &[f64], y: &[f64]) -> f64 {
    residuals(p, x, y).iter().map(|r| r * r).sum()
}

/// Evaluate the curve at `x = 0 .. 2 * n_observed - 1`.
///
/// The projection covers the observed window and an equally long window after it.
pub fn project(p: &LogisticParams, n_observed: usize) -> Vec<f64> {
    (0..2 * n_observed).map(|x| logistic4(x as f64, p)).collect()
}

//! Linear least squares via SVD.
//!
//! The Levenberg–Marquardt solver computes each trial step as the solution of
//! a small, tall linear least-squares problem:
//!
//! ```text
//! minimize ‖ [J; √λ·D] δ + [r; 0] ‖²
//! ```
//!
//! Solving the augmented system directly (instead of forming `JᵀJ`) avoids
//! squaring the condition number, which matters for the logistic curve where
//! the asymptote and steepness columns differ by many orders of magnitude.
//!
//! Nalgebra's `QR::solve` is intended for square systems, so we use SVD, which
//! also copes with rank-deficient Jacobians (e.g. a frozen parameter column).

use nalgebra::{DMatrix, DVector};

/// Solve `min ‖x β - y‖²` using SVD.
///
/// Returns `None` if no finite solution can be found.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() != y.len() || x.ncols() == 0 {
        return None;
    }
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if the strict solve fails.
    for &tol in &[1e-14, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

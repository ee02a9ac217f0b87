//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `Σ r_i(p)²` for a residual closure `r`, starting from an initial
//! parameter vector. The Jacobian is approximated by forward differences, so
//! the caller only supplies residuals.
//!
//! Each iteration:
//! 1. builds the forward-difference Jacobian `J` at the current point
//! 2. updates the diagonal scaling `D` (running max of Jacobian column norms)
//! 3. solves the damped step `[J; √λ·D] δ ≈ -[r; 0]` and tries `p + δ`,
//!    raising λ until the cost decreases or the step becomes negligible
//!
//! Trial points whose residuals are not all finite count as infinite cost, so
//! a trial that divides by zero is simply rejected.
//!
//! The solver never fails for lack of convergence: it reports how it stopped
//! via [`FitStatus`] and returns the best point found.

use nalgebra::{DMatrix, DVector};

use crate::domain::FitStatus;
use crate::error::AppError;
use crate::math::solve_least_squares;

const MIN_DAMPING: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e16;

#[derive(Debug, Clone)]
pub struct LmOptions {
    /// Stop when an accepted step reduces the cost by less than this fraction.
    pub ftol: f64,
    /// Stop when the scaled step is below this fraction of the scaled parameters.
    pub xtol: f64,
    /// Residual-evaluation budget; `None` means `200 * (n_params + 1)`.
    pub max_evaluations: Option<usize>,
    pub initial_damping: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            max_evaluations: None,
            initial_damping: 1e-3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LmReport {
    pub params: Vec<f64>,
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    pub evaluations: usize,
    pub iterations: usize,
    pub status: FitStatus,
}

enum Trial {
    Accepted,
    Converged(FitStatus),
    Budget,
    Stalled,
}

/// Run Levenberg–Marquardt from `initial`.
///
/// Errors only on unusable input: no parameters, fewer residuals than
/// parameters, or non-finite residuals at the starting point.
pub fn levenberg_marquardt<F>(residuals: F, initial: &[f64], opts: &LmOptions) -> Result<LmReport, AppError>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let m = initial.len();
    if m == 0 {
        return Err(AppError::input("Least squares needs at least one parameter."));
    }
    let max_evals = opts.max_evaluations.unwrap_or(200 * (m + 1));

    let mut p = initial.to_vec();
    let mut r = residuals(&p);
    let mut evals = 1usize;

    if r.len() < m {
        return Err(AppError::input(format!(
            "Least squares needs at least as many residuals as parameters ({} < {m}).",
            r.len()
        )));
    }
    if r.iter().any(|v| !v.is_finite()) {
        return Err(AppError::runtime(
            "Residuals are not finite at the initial guess.",
        ));
    }

    let mut cost = sum_sq(&r);
    let mut lambda = opts.initial_damping.max(MIN_DAMPING);
    let mut diag = vec![0.0_f64; m];
    let mut iterations = 0usize;

    let status = loop {
        if cost == 0.0 {
            break FitStatus::ExactFit;
        }
        if evals + m >= max_evals {
            break FitStatus::MaxEvaluations;
        }

        let jac = forward_jacobian(&residuals, &p, &r, &mut evals);
        iterations += 1;

        for (j, d) in diag.iter_mut().enumerate() {
            *d = d.max(jac.column(j).norm());
        }
        let scale: Vec<f64> = diag.iter().map(|&d| if d > 0.0 { d } else { 1.0 }).collect();
        let scaled_p = scaled_norm(&scale, &p);

        let trial = loop {
            if evals >= max_evals {
                break Trial::Budget;
            }
            let Some(delta) = damped_step(&jac, &r, &scale, lambda) else {
                lambda *= 10.0;
                if lambda > MAX_DAMPING {
                    break Trial::Stalled;
                }
                continue;
            };

            let step_small = scaled_norm(&scale, delta.as_slice()) <= opts.xtol * scaled_p;
            let candidate: Vec<f64> = p.iter().zip(delta.iter()).map(|(a, b)| a + b).collect();
            let r_candidate = residuals(&candidate);
            evals += 1;

            let cost_candidate = if r_candidate.iter().all(|v| v.is_finite()) {
                sum_sq(&r_candidate)
            } else {
                f64::INFINITY
            };

            if cost_candidate < cost {
                let reduction = (cost - cost_candidate) / cost;
                p = candidate;
                r = r_candidate;
                cost = cost_candidate;
                lambda = (lambda / 10.0).max(MIN_DAMPING);

                if reduction <= opts.ftol {
                    break Trial::Converged(FitStatus::ResidualConverged);
                }
                if step_small {
                    break Trial::Converged(FitStatus::StepConverged);
                }
                break Trial::Accepted;
            }

            if step_small {
                break Trial::Converged(FitStatus::StepConverged);
            }
            lambda *= 10.0;
            if lambda > MAX_DAMPING {
                break Trial::Stalled;
            }
        };

        match trial {
            Trial::Accepted => continue,
            Trial::Converged(status) => break status,
            Trial::Budget => break FitStatus::MaxEvaluations,
            Trial::Stalled => break FitStatus::Stalled,
        }
    };

    log::debug!(
        "levenberg-marquardt: {status:?} after {iterations} iterations, {evals} evaluations, cost={cost:.6e}"
    );

    Ok(LmReport {
        params: p,
        cost,
        evaluations: evals,
        iterations,
        status,
    })
}

/// Forward-difference Jacobian of the residuals at `p`.
///
/// Columns whose perturbed residuals are not finite are zeroed, which freezes
/// that parameter for the current iteration.
fn forward_jacobian<F>(residuals: &F, p: &[f64], r: &[f64], evals: &mut usize) -> DMatrix<f64>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let eps = f64::EPSILON.sqrt();
    let n = r.len();
    let mut jac = DMatrix::<f64>::zeros(n, p.len());
    let mut work = p.to_vec();

    for j in 0..p.len() {
        let h = if p[j] == 0.0 { eps } else { eps * p[j].abs() };
        work[j] = p[j] + h;
        let r_h = residuals(&work);
        *evals += 1;
        work[j] = p[j];

        if r_h.len() != n || r_h.iter().any(|v| !v.is_finite()) {
            log::debug!("levenberg-marquardt: non-finite derivative for parameter {j}; freezing it");
            continue;
        }
        for i in 0..n {
            jac[(i, j)] = (r_h[i] - r[i]) / h;
        }
    }

    jac
}

fn damped_step(jac: &DMatrix<f64>, r: &[f64], scale: &[f64], lambda: f64) -> Option<DVector<f64>> {
    let n = jac.nrows();
    let m = jac.ncols();
    let sqrt_lambda = lambda.sqrt();

    let mut a = DMatrix::<f64>::zeros(n + m, m);
    a.view_mut((0, 0), (n, m)).copy_from(jac);
    for j in 0..m {
        a[(n + j, j)] = sqrt_lambda * scale[j];
    }

    let mut b = DVector::<f64>::zeros(n + m);
    for i in 0..n {
        b[i] = -r[i];
    }

    solve_least_squares(&a, &b)
}

fn sum_sq(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

fn scaled_norm(scale: &[f64], v: &[f64]) -> f64 {
    scale
        .iter()
        .zip(v.iter())
        .map(|(d, x)| (d * x) * (d * x))
        .sum::<f64>()
        .sqrt()
}

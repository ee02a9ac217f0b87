//! Adaptive Dormand–Prince 5(4) integrator.
//!
//! Integrates `dy/dt = f(t, y)` and reports the state at every point of a
//! caller-supplied time grid. Steps are adapted from the embedded 4th-order
//! error estimate and clipped so that every grid point is hit exactly.
//!
//! Every Runge–Kutta stage is a linear combination of derivative evaluations,
//! so linear invariants of the system (e.g. a conserved total) are preserved
//! up to rounding regardless of step size.

use crate::error::AppError;

// Butcher tableau.
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 5th-order weights (also the last row of A, FSAL).
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// 5th minus 4th order weights.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct OdeOptions {
    pub rtol: f64,
    pub atol: f64,
    /// Abort after this many attempted steps (accepted + rejected).
    pub max_steps: usize,
}

impl Default for OdeOptions {
    fn default() -> Self {
        Self {
            rtol: 1e-9,
            atol: 1e-9,
            max_steps: 200_000,
        }
    }
}

/// Integrate `deriv` from `y0` at `grid[0]` and return the state at each grid point.
///
/// `deriv(t, y, dydt)` writes the derivative into `dydt`. The grid must be
/// non-decreasing; the first returned state is `y0` itself.
pub fn integrate<F>(deriv: F, y0: &[f64], grid: &[f64], opts: &OdeOptions) -> Result<Vec<Vec<f64>>, AppError>
where
    F: Fn(f64, &[f64], &mut [f64]),
{
    if grid.is_empty() {
        return Ok(Vec::new());
    }
    if grid.windows(2).any(|w| !(w[1] >= w[0])) {
        return Err(AppError::input("ODE time grid must be non-decreasing."));
    }
    if y0.iter().any(|v| !v.is_finite()) {
        return Err(AppError::input("ODE initial state must be finite."));
    }

    let dim = y0.len();
    let mut stepper = Stepper::new(dim);
    let mut y = y0.to_vec();
    let mut t = grid[0];
    let mut out = Vec::with_capacity(grid.len());
    out.push(y.clone());

    let span = grid[grid.len() - 1] - grid[0];
    let mut h = if span > 0.0 { (span / 100.0).min(1.0) } else { 0.0 };
    let mut steps = 0usize;

    for &t_next in &grid[1..] {
        while t < t_next {
            if steps >= opts.max_steps {
                return Err(AppError::runtime(format!(
                    "ODE integration exceeded {} steps at t={t:.6}.",
                    opts.max_steps
                )));
            }
            steps += 1;

            let remaining = t_next - t;
            let h_try = h.min(remaining);
            let err = stepper.step(&deriv, t, &y, h_try, opts);

            if !err.is_finite() {
                h = h_try * MIN_FACTOR;
                if h <= f64::EPSILON * t.abs().max(1.0) {
                    return Err(AppError::runtime(format!(
                        "ODE integration produced a non-finite state at t={t:.6}."
                    )));
                }
                continue;
            }

            let factor = if err == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
            };

            if err <= 1.0 {
                t = if h_try >= remaining { t_next } else { t + h_try };
                y.copy_from_slice(&stepper.y_new);
                // Don't let a short clipped step shrink the next one.
                if h_try < h {
                    h = h.max(h_try * factor);
                } else {
                    h = h_try * factor;
                }
            } else {
                h = h_try * factor;
                if h <= f64::EPSILON * t.abs().max(1.0) {
                    return Err(AppError::runtime(format!(
                        "ODE step size underflow at t={t:.6}."
                    )));
                }
            }
        }
        out.push(y.clone());
    }

    Ok(out)
}

/// Scratch space for one Dormand–Prince step.
struct Stepper {
    k: [Vec<f64>; 7],
    tmp: Vec<f64>,
    y_new: Vec<f64>,
}

impl Stepper {
    fn new(dim: usize) -> Self {
        Self {
            k: std::array::from_fn(|_| vec![0.0; dim]),
            tmp: vec![0.0; dim],
            y_new: vec![0.0; dim],
        }
    }

    /// Attempt one step of size `h`; leaves the 5th-order solution in
    /// `y_new` and returns the scaled RMS error estimate.
    fn step<F>(&mut self, deriv: &F, t: f64, y: &[f64], h: f64, opts: &OdeOptions) -> f64
    where
        F: Fn(f64, &[f64], &mut [f64]),
    {
        let dim = y.len();
        let [k1, k2, k3, k4, k5, k6, k7] = &mut self.k;
        let tmp = &mut self.tmp;

        deriv(t, y, &mut k1[..]);

        for i in 0..dim {
            tmp[i] = y[i] + h * A21 * k1[i];
        }
        deriv(t + C2 * h, &tmp[..], &mut k2[..]);

        for i in 0..dim {
            tmp[i] = y[i] + h * (A31 * k1[i] + A32 * k2[i]);
        }
        deriv(t + C3 * h, &tmp[..], &mut k3[..]);

        for i in 0..dim {
            tmp[i] = y[i] + h * (A41 * k1[i] + A42 * k2[i] + A43 * k3[i]);
        }
        deriv(t + C4 * h, &tmp[..], &mut k4[..]);

        for i in 0..dim {
            tmp[i] = y[i] + h * (A51 * k1[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]);
        }
        deriv(t + C5 * h, &tmp[..], &mut k5[..]);

        for i in 0..dim {
            tmp[i] = y[i] + h * (A61 * k1[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i] + A65 * k5[i]);
        }
        deriv(t + h, &tmp[..], &mut k6[..]);

        for i in 0..dim {
            self.y_new[i] = y[i] + h * (B1 * k1[i] + B3 * k3[i] + B4 * k4[i] + B5 * k5[i] + B6 * k6[i]);
        }
        deriv(t + h, &self.y_new[..], &mut k7[..]);

        let mut acc = 0.0;
        for i in 0..dim {
            let e = h * (E1 * k1[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i] + E7 * k7[i]);
            let sc = opts.atol + opts.rtol * y[i].abs().max(self.y_new[i].abs());
            acc += (e / sc) * (e / sc);
        }
        if dim == 0 {
            return 0.0;
        }
        (acc / dim as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_decay_matches_closed_form() {
        let grid: Vec<f64> = (0..=10).map(|i| i as f64 * 0.5).collect();
        let out = integrate(|_, y, dy| dy[0] = -0.7 * y[0], &[3.0], &grid, &OdeOptions::default()).unwrap();
        assert_eq!(out.len(), grid.len());
        for (state, &t) in out.iter().zip(grid.iter()) {
            let exact = 3.0 * (-0.7 * t).exp();
            assert!((state[0] - exact).abs() < 1e-8, "t={t}: {} vs {exact}", state[0]);
        }
    }

    #[test]
    fn harmonic_oscillator_conserves_energy() {
        let grid: Vec<f64> = (0..=20).map(|i| i as f64).collect();
        let out = integrate(
            |_, y, dy| {
                dy[0] = y[1];
                dy[1] = -y[0];
            },
            &[1.0, 0.0],
            &grid,
            &OdeOptions::default(),
        )
        .unwrap();
        for (state, &t) in out.iter().zip(grid.iter()) {
            assert!((state[0] - t.cos()).abs() < 1e-7);
            let energy = state[0] * state[0] + state[1] * state[1];
            assert!((energy - 1.0).abs() < 1e-7);
        }
    }

    #[test]
    fn linear_invariant_is_preserved() {
        // dx = -y, dy = y: x + y is constant.
        let grid: Vec<f64> = (0..=5).map(|i| i as f64).collect();
        let out = integrate(
            |_, s, d| {
                d[0] = -s[1];
                d[1] = s[1];
            },
            &[10.0, 1.0],
            &grid,
            &OdeOptions::default(),
        )
        .unwrap();
        for s in &out {
            assert!((s[0] + s[1] - 11.0).abs() < 1e-9);
        }
    }

    #[test]
    fn repeated_grid_points_are_allowed() {
        let out = integrate(|_, y, dy| dy[0] = y[0], &[1.0], &[0.0, 0.0, 1.0], &OdeOptions::default()).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[1][0], 1.0);
        assert!((out[2][0] - std::f64::consts::E).abs() < 1e-8);
    }

    #[test]
    fn decreasing_grid_is_rejected() {
        assert!(integrate(|_, _, _| {}, &[1.0], &[1.0, 0.0], &OdeOptions::default()).is_err());
    }
}

//! Susceptible-Infected-Recovered compartment model.
//!
//! ```text
//! dS/dt = -β S I / N
//! dI/dt =  β S I / N - γ I
//! dR/dt =  γ I
//! ```
//!
//! β and γ are supplied by the caller; the simulator projects forward from
//! `(S0, I0, R0)` with `S0 = N - I0 - R0` and never fits anything.
//!
//! The right-hand side sums to zero, so `S + I + R = N` holds along the exact
//! solution and, since the integrator is a Runge–Kutta method, to rounding
//! along the numerical one too.

use rayon::prelude::*;

use crate::domain::{SirParams, SirState, SirTrajectory};
use crate::error::AppError;
use crate::math::{OdeOptions, integrate};

/// A validated SIR model ready to simulate.
#[derive(Debug, Clone)]
pub struct SirModel {
    params: SirParams,
}

impl SirModel {
    /// Validate `params`.
    ///
    /// Rejects `I0 + R0 > N` (which would make `S0` negative), negative or
    /// non-finite rates and counts, and an empty horizon.
    pub fn new(params: SirParams) -> Result<Self, AppError> {
        let SirParams {
            population,
            infected,
            recovered,
            beta,
            gamma,
            horizon_days,
        } = params;

        if !(population.is_finite() && population > 0.0) {
            return Err(AppError::runtime(format!(
                "SIR population must be positive (got {population})."
            )));
        }
        for (name, v) in [("infected", infected), ("recovered", recovered), ("beta", beta), ("gamma", gamma)] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(AppError::runtime(format!(
                    "SIR {name} must be finite and non-negative (got {v})."
                )));
            }
        }
        if infected + recovered > population {
            return Err(AppError::runtime(format!(
                "SIR initial infected + recovered ({}) exceeds the population ({population}).",
                infected + recovered
            )));
        }
        if horizon_days == 0 {
            return Err(AppError::runtime("SIR horizon must be at least one day."));
        }

        Ok(Self { params })
    }

    pub fn params(&self) -> &SirParams {
        &self.params
    }

    pub fn initial_state(&self) -> SirState {
        let p = &self.params;
        SirState {
            susceptible: p.population - p.infected - p.recovered,
            infected: p.infected,
            recovered: p.recovered,
        }
    }

    /// Write `(dS, dI, dR)` for `state = (S, I, R)` into `out`.
    pub fn derivatives(&self, state: &[f64], out: &mut [f64]) {
        let SirParams {
            population: n,
            beta,
            gamma,
            ..
        } = self.params;
        let (s, i) = (state[0], state[1]);

        let infections = beta * s * i / n;
        let recoveries = gamma * i;
        out[0] = -infections;
        out[1] = infections - recoveries;
        out[2] = recoveries;
    }

    /// Integrate over [`time_grid`] of the configured horizon.
    pub fn simulate(&self) -> Result<SirTrajectory, AppError> {
        self.simulate_with(&OdeOptions::default())
    }

    pub fn simulate_with(&self, opts: &OdeOptions) -> Result<SirTrajectory, AppError> {
        let grid = time_grid(self.params.horizon_days);
        let s0 = self.initial_state();
        let y0 = [s0.susceptible, s0.infected, s0.recovered];

        let states = integrate(|_, y, dy| self.derivatives(y, dy), &y0, &grid, opts)?;

        let mut susceptible = Vec::with_capacity(states.len());
        let mut infected = Vec::with_capacity(states.len());
        let mut recovered = Vec::with_capacity(states.len());
        for s in &states {
            susceptible.push(s[0]);
            infected.push(s[1]);
            recovered.push(s[2]);
        }

        Ok(SirTrajectory {
            params: self.params,
            t: grid,
            susceptible,
            infected,
            recovered,
        })
    }
}

/// `horizon` evenly spaced points spanning `[0, horizon]` days (both ends included).
pub fn time_grid(horizon: usize) -> Vec<f64> {
    match horizon {
        0 => Vec::new(),
        1 => vec![0.0],
        n => {
            let step = n as f64 / (n as f64 - 1.0);
            (0..n).map(|k| k as f64 * step).collect()
        }
    }
}

/// Validate and simulate one parameter set.
pub fn simulate(params: SirParams) -> Result<SirTrajectory, AppError> {
    SirModel::new(params)?.simulate()
}

/// Simulate independent parameter sets in parallel; results keep the input order.
pub fn simulate_many(params: &[SirParams]) -> Vec<Result<SirTrajectory, AppError>> {
    params.par_iter().map(|p| simulate(*p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> SirParams {
        SirParams {
            population: 1000.0,
            infected: 1.0,
            recovered: 0.0,
            beta: 0.3,
            gamma: 0.1,
            horizon_days: 50,
        }
    }

    #[test]
    fn time_grid_spans_horizon() {
        let g = time_grid(50);
        assert_eq!(g.len(), 50);
        assert_eq!(g[0], 0.0);
        assert!((g[49] - 50.0).abs() < 1e-12);
        assert_eq!(time_grid(1), vec![0.0]);
    }

    #[test]
    fn population_is_conserved() {
        let traj = simulate(scenario()).unwrap();
        let n = scenario().population;
        for k in 0..traj.len() {
            let total = traj.state(k).total();
            assert!((total - n).abs() <= 1e-6 * n, "t={}: total={total}", traj.t[k]);
        }
    }

    #[test]
    fn susceptible_falls_and_recovered_rises() {
        let params = SirParams {
            population: 12_000_000.0,
            infected: 5_000.0,
            recovered: 1_000.0,
            beta: 0.2,
            gamma: 1.0 / 21.0,
            horizon_days: 120,
        };
        let traj = simulate(params).unwrap();
        let tol = 1e-9 * params.population;
        for w in traj.susceptible.windows(2) {
            assert!(w[1] <= w[0] + tol);
        }
        for w in traj.recovered.windows(2) {
            assert!(w[1] >= w[0] - tol);
        }
    }

    #[test]
    fn no_initial_infection_means_no_epidemic() {
        let params = SirParams {
            infected: 0.0,
            recovered: 10.0,
            ..scenario()
        };
        let traj = simulate(params).unwrap();
        assert!(traj.infected.iter().all(|&i| i == 0.0));
        assert!(traj.susceptible.iter().all(|&s| s == 990.0));
        assert!(traj.recovered.iter().all(|&r| r == 10.0));
    }

    #[test]
    fn outbreak_peaks_inside_the_horizon() {
        let traj = simulate(scenario()).unwrap();
        let (t_peak, i_peak) = traj.peak_infected().unwrap();
        let last = traj.len() - 1;

        assert!(t_peak > 0.0 && t_peak < traj.t[last], "peak at t={t_peak}");
        assert!(i_peak > traj.infected[0]);
        assert!(i_peak > traj.infected[last]);

        let r_final = traj.recovered[last];
        assert!(r_final > 500.0 && r_final < 1000.0, "R(50)={r_final}");
    }

    #[test]
    fn peak_matches_independent_fine_step_rk4() {
        let params = scenario();
        let traj = simulate(params).unwrap();
        let model = SirModel::new(params).unwrap();

        // Classic RK4 with 1000 sub-steps per grid interval.
        let grid = time_grid(params.horizon_days);
        let sub = 1000;
        let mut y = [999.0, 1.0, 0.0];
        let mut reference = vec![y[1]];
        for w in grid.windows(2) {
            let h = (w[1] - w[0]) / sub as f64;
            for _ in 0..sub {
                let mut k1 = [0.0; 3];
                let mut k2 = [0.0; 3];
                let mut k3 = [0.0; 3];
                let mut k4 = [0.0; 3];
                model.derivatives(&y, &mut k1);
                let y2: Vec<f64> = (0..3).map(|i| y[i] + 0.5 * h * k1[i]).collect();
                model.derivatives(&y2, &mut k2);
                let y3: Vec<f64> = (0..3).map(|i| y[i] + 0.5 * h * k2[i]).collect();
                model.derivatives(&y3, &mut k3);
                let y4: Vec<f64> = (0..3).map(|i| y[i] + h * k3[i]).collect();
                model.derivatives(&y4, &mut k4);
                for i in 0..3 {
                    y[i] += h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
                }
            }
            reference.push(y[1]);
        }

        let ref_peak = reference.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let (_, peak) = traj.peak_infected().unwrap();
        assert!((peak - ref_peak).abs() <= 1e-6 * ref_peak, "{peak} vs {ref_peak}");
    }

    #[test]
    fn rejects_negative_initial_susceptible() {
        let params = SirParams {
            infected: 900.0,
            recovered: 200.0,
            ..scenario()
        };
        assert!(SirModel::new(params).is_err());
    }

    #[test]
    fn simulate_many_keeps_input_order() {
        let inputs: Vec<SirParams> = [1.0, 2.0, 3.0]
            .iter()
            .map(|&i0| SirParams {
                infected: i0,
                ..scenario()
            })
            .collect();
        let out = simulate_many(&inputs);
        assert_eq!(out.len(), 3);
        for (res, input) in out.iter().zip(inputs.iter()) {
            assert_eq!(res.as_ref().unwrap().infected[0], input.infected);
        }
    }
}

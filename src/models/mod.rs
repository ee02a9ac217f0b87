//! Epidemic model implementations.
//!
//! - `logistic`: evaluation of the four-parameter logistic (4PL) curve
//! - `sir`: the Susceptible-Infected-Recovered compartment model and its simulator
//!
//! Curve evaluation is kept as small, pure functions so that fitting code can
//! stay generic over the residual closure.

pub mod logistic;
pub mod sir;

pub use logistic::*;
pub use sir::*;

//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - validate the starting guess
//! - run Levenberg–Marquardt over the 4PL residuals
//! - package parameters, solver outcome and the dated projection

pub mod logistic;

pub use logistic::*;

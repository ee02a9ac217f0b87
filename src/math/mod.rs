//! Numerical building blocks: explicit division/clamp rules, Savitzky–Golay
//! smoothing, linear and nonlinear least squares, and ODE integration.

pub mod lm;
pub mod ode;
pub mod ols;
pub mod sanitize;
pub mod savgol;

pub use lm::*;
pub use ode::*;
pub use ols::*;
pub use sanitize::*;
pub use savgol::*;

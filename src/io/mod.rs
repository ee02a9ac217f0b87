//! Output files.
//!
//! - metrics, world snapshot and SIR trajectory exports (CSV) (`export`)
//! - logistic fit JSON read/write (`curve`)

pub mod curve;
pub mod export;

pub use curve::*;
pub use export::*;

//! Data acquisition: CSSE download or local read, reshaping into
//! per-country series, and synthetic tables for offline runs.

pub mod csse;
pub mod reshape;
pub mod sample;

pub use csse::*;
pub use reshape::*;
pub use sample::*;

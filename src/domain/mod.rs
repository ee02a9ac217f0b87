//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - daily time series and per-country case tables (`TimeSeries`, `CountrySeries`)
//! - metric and table selectors (`CaseKind`, `MetricKind`)
//! - model inputs/outputs (`LogisticParams`, `LogisticFit`, `SirParams`, `SirTrajectory`)
//! - the resolved run configuration (`AnalysisConfig`)

pub mod types;

pub use types::*;

//! Metrics definitions and instrumentation helpers.

pub mod metrics;

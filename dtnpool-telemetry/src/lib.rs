//! # dtnpool telemetry
//!
//! Log subscriber setup for the pool binaries.

pub mod logging;

pub use logging::{PoolLogger, TelemetryError};

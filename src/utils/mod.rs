//! Shared utilities and error types

pub mod error;

pub use error::{ConfigError, EstimatorError, Result, TaskEventError, TraceError};

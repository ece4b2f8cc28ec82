//! Error types for the queueing estimator

use std::time::Duration;

use thiserror::Error;

/// Main error type for estimator operations
#[derive(Debug, Error)]
pub enum EstimatorError {
    /// Configuration rejected during validation
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// Out-of-order or inconsistent task events
    #[error("Task event error: {0}")]
    Task(#[from] TaskEventError),
    /// Trace file problems
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),
    /// The monitor task is gone
    #[error("Monitor channel closed")]
    ChannelClosed,
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON errors outside of trace lines (config files)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Window must cover some time
    #[error("window duration must be non-zero")]
    ZeroWindow,
    /// At least one step per window
    #[error("steps per window must be at least 1")]
    ZeroSteps,
    /// Window too small to split into steps
    #[error("window of {window:?} cannot be split into {steps} non-zero steps")]
    StepTooNarrow { window: Duration, steps: usize },
    /// Too many steps for the running average
    #[error("steps per window {0} exceeds the supported maximum")]
    TooManySteps(usize),
    /// Threshold must be positive
    #[error("invalid task threshold must be non-zero")]
    ZeroThreshold,
}

/// Task-event specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskEventError {
    /// A task started while another top-level task was still running
    #[error("a top-level task is already in flight")]
    TaskAlreadyRunning,
    /// Completion or nested loop with nothing running
    #[error("no top-level task is in flight")]
    NoTaskInFlight,
    /// Timestamp earlier than the event it closes
    #[error("time went backwards by {0:?}")]
    TimeWentBackwards(Duration),
}

/// Trace-specific errors
#[derive(Debug, Error)]
pub enum TraceError {
    /// Line is not a valid trace event
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    /// Event was rejected by the estimator
    #[error("line {line}: {source}")]
    Event {
        line: usize,
        #[source]
        source: TaskEventError,
    },
}

/// Convenience Result type for estimator operations
pub type Result<T> = std::result::Result<T, EstimatorError>;

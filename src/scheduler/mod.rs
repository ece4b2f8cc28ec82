//! Main-thread responsiveness metrics
//!
//! Estimates the expected queueing time (EQT): how long a piece of work
//! posted at a random instant would wait for the thread, given the tasks
//! that actually ran.
//!
//! - `estimator`: the sliding-window estimator and its event API
//! - `contribution`: per-task, per-step expected queueing time
//! - `running_average`: circular buffer of step values
//! - `spans`: backgrounded and nested-loop spans excluded from reporting
//! - `split`: EQT attributed to task queue kinds
//! - `client`: reporting trait and stock clients
//! - `config`: estimator configuration

mod client;
mod config;
mod contribution;
mod estimator;
mod running_average;
mod spans;
mod split;

pub use client::{NullClient, QueueingTimeClient, RecordingClient, WindowReport};
pub use config::{
    DEFAULT_INVALID_TASK_THRESHOLD_MS, DEFAULT_STEPS_PER_WINDOW, DEFAULT_WINDOW_MS,
    EstimatorConfig,
};
pub use contribution::expected_queueing_time_from_task;
pub use estimator::{EstimatorStats, QueueingTimeEstimator};
pub use running_average::RunningAverage;
pub use spans::{ExcludedSpans, Span};
pub use split::{SplitCalculator, TaskQueueKind};

//! # Queueing Estimator - main-thread responsiveness metrics
//!
//! Estimates the expected queueing time (EQT) of a renderer main thread: the
//! delay a piece of work would see if it were posted at a uniformly random
//! instant, given the tasks that actually ran. The estimate is produced per
//! step and reported as a sliding-window average.
//!
//! ## Architecture
//!
//! - **scheduler**: the estimator, its configuration and reporting clients
//! - **monitor**: the estimator as a tokio task fed over channels
//! - **trace**: offline replay of JSON-lines scheduler traces
//! - **utils**: shared error types
//!
//! ```
//! use std::time::{Duration, Instant};
//! use queueing_estimator::{EstimatorConfig, QueueingTimeEstimator, RecordingClient, TaskQueueKind};
//!
//! let config = EstimatorConfig::new(Duration::from_secs(5), 1)?;
//! let mut estimator = QueueingTimeEstimator::new(RecordingClient::new(), config)?;
//! let start = Instant::now();
//!
//! estimator.on_top_level_task_started(start, TaskQueueKind::Default)?;
//! estimator.on_top_level_task_completed(start + Duration::from_secs(3))?;
//!
//! let eqt = estimator.estimate_queueing_time_including_current_task(start + Duration::from_secs(3))?;
//! assert_eq!(eqt, Duration::from_millis(900));
//! # Ok::<(), queueing_estimator::EstimatorError>(())
//! ```

pub mod monitor;
pub mod scheduler;
pub mod trace;
pub mod utils;

// Re-export main types for convenience
pub use scheduler::{
    EstimatorConfig, EstimatorStats, QueueingTimeClient, QueueingTimeEstimator, RecordingClient,
    TaskQueueKind, WindowReport,
};
pub use utils::error::{EstimatorError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "Queueing Estimator";

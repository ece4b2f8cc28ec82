//! Estimator running as its own tokio task
//!
//! Producers (the scheduler's task observer, lifecycle notifications) talk to
//! the estimator through a cloneable [`MonitorHandle`]; reports come back on
//! an unbounded channel. Dropping every handle, or calling
//! [`MonitorHandle::shutdown`], stops the task.

mod channel_client;

pub use channel_client::{ChannelClient, EstimatorReport};

use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};

use crate::scheduler::{EstimatorConfig, EstimatorStats, QueueingTimeEstimator, TaskQueueKind};
use crate::utils::{EstimatorError, Result};

enum Command {
    TaskStarted {
        at: Instant,
        kind: TaskQueueKind,
    },
    TaskCompleted {
        at: Instant,
    },
    NestedRunLoop,
    RendererStateChanged {
        backgrounded: bool,
        at: Instant,
    },
    Estimate {
        now: Instant,
        reply: oneshot::Sender<Result<Duration>>,
    },
    Stats {
        reply: oneshot::Sender<EstimatorStats>,
    },
    Shutdown {
        reply: oneshot::Sender<EstimatorStats>,
    },
}

/// Handle for feeding events to a spawned estimator
#[derive(Clone)]
pub struct MonitorHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl MonitorHandle {
    pub fn task_started(&self, at: Instant, kind: TaskQueueKind) -> Result<()> {
        self.send(Command::TaskStarted { at, kind })
    }

    pub fn task_completed(&self, at: Instant) -> Result<()> {
        self.send(Command::TaskCompleted { at })
    }

    pub fn begin_nested_run_loop(&self) -> Result<()> {
        self.send(Command::NestedRunLoop)
    }

    pub fn renderer_state_changed(&self, backgrounded: bool, at: Instant) -> Result<()> {
        self.send(Command::RendererStateChanged { backgrounded, at })
    }

    /// Queueing time at `now`, including the task still running
    pub async fn estimate(&self, now: Instant) -> Result<Duration> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Estimate { now, reply })?;
        response.await.map_err(|_| EstimatorError::ChannelClosed)?
    }

    pub async fn stats(&self) -> Result<EstimatorStats> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Stats { reply })?;
        response.await.map_err(|_| EstimatorError::ChannelClosed)
    }

    /// Stop the estimator task and return its final counters
    pub async fn shutdown(self) -> Result<EstimatorStats> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Shutdown { reply })?;
        response.await.map_err(|_| EstimatorError::ChannelClosed)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| EstimatorError::ChannelClosed)
    }
}

/// Spawn an estimator on the current tokio runtime.
///
/// Must be called from within a runtime.
pub fn spawn(
    config: EstimatorConfig,
) -> Result<(MonitorHandle, mpsc::UnboundedReceiver<EstimatorReport>)> {
    let (report_tx, report_rx) = mpsc::unbounded_channel();
    let estimator = QueueingTimeEstimator::new(ChannelClient::new(report_tx), config)?;
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    tokio::spawn(run(estimator, command_rx));

    Ok((
        MonitorHandle {
            commands: command_tx,
        },
        report_rx,
    ))
}

async fn run(
    mut estimator: QueueingTimeEstimator<ChannelClient>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    while let Some(command) = commands.recv().await {
        let outcome = match command {
            Command::TaskStarted { at, kind } => estimator.on_top_level_task_started(at, kind),
            Command::TaskCompleted { at } => estimator.on_top_level_task_completed(at),
            Command::NestedRunLoop => estimator.on_begin_nested_run_loop(),
            Command::RendererStateChanged { backgrounded, at } => {
                estimator.on_renderer_state_changed(backgrounded, at);
                Ok(())
            }
            Command::Estimate { now, reply } => {
                let _ = reply.send(estimator.estimate_queueing_time_including_current_task(now));
                Ok(())
            }
            Command::Stats { reply } => {
                let _ = reply.send(estimator.stats());
                Ok(())
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(estimator.stats());
                break;
            }
        };
        if let Err(e) = outcome {
            warn!("Dropping estimator event: {}", e);
        }
    }
    debug!("Estimator monitor stopped: {:?}", estimator.stats());
}

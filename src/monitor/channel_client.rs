//! Client forwarding reports over a channel

use std::time::Duration;

use log::trace;
use tokio::sync::mpsc::UnboundedSender;

use crate::scheduler::{QueueingTimeClient, TaskQueueKind, WindowReport};

/// Output of the estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorReport {
    /// A step finished
    Window(WindowReport),
    /// Per-kind value for a disjoint window
    Split {
        kind: TaskQueueKind,
        queueing_time: Duration,
    },
}

/// Sends every report to an unbounded channel. Reports are dropped once the
/// receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelClient {
    sender: UnboundedSender<EstimatorReport>,
}

impl ChannelClient {
    pub fn new(sender: UnboundedSender<EstimatorReport>) -> Self {
        Self { sender }
    }

    fn forward(&self, report: EstimatorReport) {
        if self.sender.send(report).is_err() {
            trace!("Report receiver closed, dropping {:?}", report);
        }
    }
}

impl QueueingTimeClient for ChannelClient {
    fn on_queueing_time_for_window_estimated(&mut self, report: &WindowReport) {
        self.forward(EstimatorReport::Window(*report));
    }

    fn on_split_queueing_time_estimated(&mut self, kind: TaskQueueKind, queueing_time: Duration) {
        self.forward(EstimatorReport::Split {
            kind,
            queueing_time,
        });
    }
}

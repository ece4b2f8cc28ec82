//! Reporting seam between the estimator and whoever consumes its output

use std::time::{Duration, Instant};

use super::split::TaskQueueKind;

/// One finished step, reported with the window average it produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowReport {
    /// Average expected queueing time over the sliding window
    pub queueing_time: Duration,
    /// Start of the step that was just finished
    pub step_start: Instant,
    /// The step closed a window that shares no step with the previous
    /// disjoint window
    pub is_disjoint_window: bool,
}

/// Receives estimates as steps are finished
pub trait QueueingTimeClient {
    fn on_queueing_time_for_window_estimated(&mut self, report: &WindowReport);

    fn on_split_queueing_time_estimated(&mut self, _kind: TaskQueueKind, _queueing_time: Duration) {
    }
}

/// Client that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullClient;

impl QueueingTimeClient for NullClient {
    fn on_queueing_time_for_window_estimated(&mut self, _report: &WindowReport) {}
}

/// Client that keeps every report in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingClient {
    window_reports: Vec<WindowReport>,
    split_reports: Vec<(TaskQueueKind, Duration)>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window_reports(&self) -> &[WindowReport] {
        &self.window_reports
    }

    pub fn split_reports(&self) -> &[(TaskQueueKind, Duration)] {
        &self.split_reports
    }

    /// Reported window averages, in order
    pub fn queueing_times(&self) -> Vec<Duration> {
        self.window_reports.iter().map(|r| r.queueing_time).collect()
    }

    /// Reported split values for one kind, one per disjoint window
    pub fn split_values(&self, kind: TaskQueueKind) -> Vec<Duration> {
        self.split_reports
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn last_report(&self) -> Option<&WindowReport> {
        self.window_reports.last()
    }

    pub fn clear(&mut self) {
        self.window_reports.clear();
        self.split_reports.clear();
    }
}

impl QueueingTimeClient for RecordingClient {
    fn on_queueing_time_for_window_estimated(&mut self, report: &WindowReport) {
        self.window_reports.push(*report);
    }

    fn on_split_queueing_time_estimated(&mut self, kind: TaskQueueKind, queueing_time: Duration) {
        self.split_reports.push((kind, queueing_time));
    }
}

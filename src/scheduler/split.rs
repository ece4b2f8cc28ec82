//! Expected queueing time split by task queue kind
//!
//! Each step's contribution is also attributed to the kind of queue the task
//! came from. Split values are reported once per disjoint window, so their
//! sum equals the EQT of that window.

use std::time::Duration;

use serde::Deserialize;

use super::client::QueueingTimeClient;

/// Task queue kinds tracked separately
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskQueueKind {
    /// Default queue
    Default,
    /// Default loading queue
    DefaultLoading,
    /// Per-frame loading queue
    FrameLoading,
    /// Per-frame throttleable queue (timers)
    FrameThrottleable,
    /// Per-frame pausable queue
    FramePausable,
    /// Unthrottled queue
    Unthrottled,
    /// Compositor queue
    Compositor,
    /// Everything else (control, unpausable, untagged tasks)
    #[default]
    #[serde(other)]
    Other,
}

impl TaskQueueKind {
    /// All kinds, in reporting order
    pub const ALL: [TaskQueueKind; 8] = [
        TaskQueueKind::Default,
        TaskQueueKind::DefaultLoading,
        TaskQueueKind::FrameLoading,
        TaskQueueKind::FrameThrottleable,
        TaskQueueKind::FramePausable,
        TaskQueueKind::Unthrottled,
        TaskQueueKind::Compositor,
        TaskQueueKind::Other,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskQueueKind::Default => "Default",
            TaskQueueKind::DefaultLoading => "DefaultLoading",
            TaskQueueKind::FrameLoading => "FrameLoading",
            TaskQueueKind::FrameThrottleable => "FrameThrottleable",
            TaskQueueKind::FramePausable => "FramePausable",
            TaskQueueKind::Unthrottled => "Unthrottled",
            TaskQueueKind::Compositor => "Compositor",
            TaskQueueKind::Other => "Other",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Per-kind accumulators for the current step and the current disjoint window
#[derive(Debug, Clone)]
pub struct SplitCalculator {
    steps_per_window: u32,
    step_eqt: [Duration; TaskQueueKind::COUNT],
    window_eqt: [Duration; TaskQueueKind::COUNT],
}

impl SplitCalculator {
    pub fn new(steps_per_window: usize) -> Self {
        Self {
            steps_per_window: u32::try_from(steps_per_window.max(1)).unwrap_or(u32::MAX),
            step_eqt: [Duration::ZERO; TaskQueueKind::COUNT],
            window_eqt: [Duration::ZERO; TaskQueueKind::COUNT],
        }
    }

    /// Attribute part of the current step to `kind`
    pub fn add(&mut self, kind: TaskQueueKind, queueing_time: Duration) {
        self.step_eqt[kind.index()] += queueing_time;
    }

    /// Drop the current step (it was skipped)
    pub fn reset_step(&mut self) {
        self.step_eqt = [Duration::ZERO; TaskQueueKind::COUNT];
    }

    /// Fold the finished step into the window; report if it closed a
    /// disjoint window.
    pub fn end_step(&mut self, is_disjoint_window: bool, client: &mut dyn QueueingTimeClient) {
        for (window, step) in self.window_eqt.iter_mut().zip(self.step_eqt.iter()) {
            *window += *step;
        }
        self.reset_step();

        if !is_disjoint_window {
            return;
        }
        for kind in TaskQueueKind::ALL {
            client.on_split_queueing_time_estimated(
                kind,
                self.window_eqt[kind.index()] / self.steps_per_window,
            );
        }
        self.window_eqt = [Duration::ZERO; TaskQueueKind::COUNT];
    }
}

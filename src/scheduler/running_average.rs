//! Circular buffer of per-step queueing times

use std::time::Duration;

/// Running average over the last `steps_per_window` steps.
///
/// The buffer starts zero-filled, so the average ramps up over the first
/// window instead of being computed over fewer samples.
#[derive(Debug, Clone)]
pub struct RunningAverage {
    index: usize,
    circular_buffer: Vec<Duration>,
    running_sum: Duration,
}

impl RunningAverage {
    /// Create a zero-filled running average. `steps_per_window` must be at
    /// least 1 and fit in a `u32`; `EstimatorConfig::validate` checks both.
    pub fn new(steps_per_window: usize) -> Self {
        debug_assert!(steps_per_window >= 1);
        Self {
            index: 0,
            circular_buffer: vec![Duration::ZERO; steps_per_window.max(1)],
            running_sum: Duration::ZERO,
        }
    }

    /// Number of steps making up one window
    pub fn steps_per_window(&self) -> usize {
        self.circular_buffer.len()
    }

    /// Push the value of a finished step, evicting the oldest one
    pub fn add(&mut self, value: Duration) {
        self.running_sum = self.running_sum - self.circular_buffer[self.index] + value;
        self.circular_buffer[self.index] = value;
        self.index = (self.index + 1) % self.circular_buffer.len();
    }

    /// Mean over the whole window
    pub fn average(&self) -> Duration {
        self.running_sum / self.divisor()
    }

    /// The average `add(next)` would produce, without pushing
    pub fn average_with(&self, next: Duration) -> Duration {
        (self.running_sum - self.circular_buffer[self.index] + next) / self.divisor()
    }

    /// True right after the step that completes a disjoint window was added
    pub fn index_is_zero(&self) -> bool {
        self.index == 0
    }

    fn divisor(&self) -> u32 {
        u32::try_from(self.circular_buffer.len()).unwrap_or(u32::MAX)
    }
}

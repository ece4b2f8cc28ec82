//! Queueing time contributed by one task to one step
//!
//! Consider a request R arriving at a uniformly random instant inside a
//! step, and a task T overlapping that step on `[t0, t1)`. R waits only if it
//! lands inside `[t0, t1)`, which happens with probability
//! `(t1 - t0) / step_width`. Given that it does, the wait decreases linearly
//! from `task_end - t0` to `task_end - t1`, so its expectation is the mean of
//! the two. The contribution is the product.

use std::time::{Duration, Instant};

/// Expected queueing time of task `[task_start, task_end)` within step
/// `[step_start, step_end)`.
pub fn expected_queueing_time_from_task(
    task_start: Instant,
    task_end: Instant,
    step_start: Instant,
    step_end: Instant,
) -> Duration {
    debug_assert!(task_start <= task_end);
    debug_assert!(step_start < step_end);

    // Steps skipped while backgrounded can leave the step ahead of the task.
    if task_end < step_start {
        return Duration::ZERO;
    }

    let task_in_step_start = task_start.max(step_start);
    let task_in_step_end = task_end.min(step_end);
    if task_in_step_end <= task_in_step_start {
        return Duration::ZERO;
    }

    let overlap = (task_in_step_end - task_in_step_start).as_nanos();
    let step_width = (step_end - step_start).as_nanos();
    let wait_sum =
        (task_end - task_in_step_start).as_nanos() + (task_end - task_in_step_end).as_nanos();

    // overlap / width * wait_sum / 2, kept in integers so that millisecond
    // inputs give exact results.
    let nanos = overlap * wait_sum / (2 * step_width);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

//! Sliding-window expected queueing time estimator
//!
//! Time is split into steps of `window_duration / steps_per_window`, tiled
//! from the start of the first counted task. Completed tasks add their
//! contribution to every step they overlap; when a task ends past the current
//! step, that step is pushed into the running average and the client gets the
//! new window average. Steps overlapping an excluded span (backgrounded
//! renderer, nested run loop) are skipped without being reported.

use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use super::client::{QueueingTimeClient, RecordingClient, WindowReport};
use super::config::EstimatorConfig;
use super::contribution::expected_queueing_time_from_task;
use super::running_average::RunningAverage;
use super::spans::ExcludedSpans;
use super::split::{SplitCalculator, TaskQueueKind};
use crate::utils::{Result, TaskEventError};

/// Counters kept by the estimator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EstimatorStats {
    /// Top-level tasks that fed the estimate
    pub tasks_completed: u64,
    /// Tasks discarded for exceeding the invalid task threshold
    pub invalid_tasks: u64,
    /// Tasks that entered a nested run loop
    pub nested_tasks: u64,
    /// Steps pushed into the running average
    pub steps_reported: u64,
    /// Steps skipped because they overlapped an excluded span
    pub steps_skipped: u64,
}

#[derive(Debug, Clone, Copy)]
struct InFlightTask {
    start: Instant,
    kind: TaskQueueKind,
    nested: bool,
}

/// Everything the estimator knows, minus the client. Cloned to answer
/// on-demand estimates without disturbing the real state.
#[derive(Debug, Clone)]
struct EstimatorState {
    step_width: Duration,
    invalid_task_threshold: Duration,
    step_queueing_times: RunningAverage,
    step_start: Option<Instant>,
    step_expected_queueing_time: Duration,
    current_task: Option<InFlightTask>,
    excluded: ExcludedSpans,
    backgrounded: bool,
    split: SplitCalculator,
    stats: EstimatorStats,
}

impl EstimatorState {
    fn new(config: &EstimatorConfig) -> Self {
        Self {
            step_width: config.step_width(),
            invalid_task_threshold: config.invalid_task_threshold,
            step_queueing_times: RunningAverage::new(config.steps_per_window),
            step_start: None,
            step_expected_queueing_time: Duration::ZERO,
            current_task: None,
            excluded: ExcludedSpans::new(),
            backgrounded: false,
            split: SplitCalculator::new(config.steps_per_window),
            stats: EstimatorStats::default(),
        }
    }

    fn on_top_level_task_started(
        &mut self,
        at: Instant,
        kind: TaskQueueKind,
    ) -> std::result::Result<(), TaskEventError> {
        if self.current_task.is_some() {
            return Err(TaskEventError::TaskAlreadyRunning);
        }
        self.current_task = Some(InFlightTask {
            start: at,
            kind,
            nested: false,
        });
        Ok(())
    }

    fn on_begin_nested_run_loop(&mut self) -> std::result::Result<(), TaskEventError> {
        let task = self
            .current_task
            .as_mut()
            .ok_or(TaskEventError::NoTaskInFlight)?;
        task.nested = true;
        Ok(())
    }

    fn on_top_level_task_completed(
        &mut self,
        client: &mut dyn QueueingTimeClient,
        task_end: Instant,
    ) -> std::result::Result<(), TaskEventError> {
        let task = self.current_task.ok_or(TaskEventError::NoTaskInFlight)?;
        if task_end < task.start {
            return Err(TaskEventError::TimeWentBackwards(task.start - task_end));
        }
        self.current_task = None;

        if task.nested {
            // Long nested loops don't hurt responsiveness; keep their time
            // out of every window.
            self.excluded.push_closed(task.start, task_end);
            self.stats.nested_tasks += 1;
            debug!(
                "Excluding {:?} task with nested run loop",
                task_end - task.start
            );
            return Ok(());
        }

        let duration = task_end - task.start;
        if duration > self.invalid_task_threshold {
            // Most likely the machine slept mid-task.
            self.stats.invalid_tasks += 1;
            warn!(
                "Ignoring {:?} task longer than {:?}",
                duration, self.invalid_task_threshold
            );
            return Ok(());
        }

        if self.step_start.is_none() {
            self.step_start = Some(task.start);
            self.excluded.prune(task.start);
        }
        self.advance(client, &task, task_end);
        self.stats.tasks_completed += 1;
        Ok(())
    }

    fn on_renderer_state_changed(&mut self, backgrounded: bool, at: Instant) {
        if backgrounded == self.backgrounded {
            debug!("Renderer already backgrounded={}, ignoring", backgrounded);
            return;
        }
        self.backgrounded = backgrounded;
        if backgrounded {
            self.excluded.begin(at);
        } else {
            self.excluded.end(at);
        }
    }

    fn advance(
        &mut self,
        client: &mut dyn QueueingTimeClient,
        task: &InFlightTask,
        task_end: Instant,
    ) {
        let Some(mut step_start) = self.step_start else {
            return;
        };

        loop {
            let step_end = step_start + self.step_width;
            if task_end < step_end {
                break;
            }
            match self.excluded.overlap(step_start, step_end) {
                Some(span_end) => {
                    step_start = self.skip_steps(step_start, span_end, task_end);
                }
                None => {
                    if task.start < step_end {
                        self.add_contribution(task, task_end, step_start, step_end);
                    }
                    self.finish_step(client, step_start);
                    step_start = step_end;
                }
            }
            self.excluded.prune(step_start);
        }

        self.step_start = Some(step_start);
        self.add_contribution(task, task_end, step_start, step_start + self.step_width);
    }

    /// Jump over the steps covered by a span, stopping at the step holding
    /// `now`. Returns the new step start.
    fn skip_steps(&mut self, step_start: Instant, span_end: Option<Instant>, now: Instant) -> Instant {
        let width = self.step_width.as_nanos();
        let complete_steps = (now - step_start).as_nanos() / width;
        let covered_steps = match span_end {
            Some(end) => (end - step_start).as_nanos().div_ceil(width),
            None => complete_steps,
        };
        let steps = covered_steps.min(complete_steps).max(1);

        self.step_expected_queueing_time = Duration::ZERO;
        self.split.reset_step();
        self.stats.steps_skipped += u64::try_from(steps).unwrap_or(u64::MAX);
        trace!("Skipping {} excluded step(s)", steps);

        step_start + nanos_to_duration(width * steps)
    }

    fn add_contribution(
        &mut self,
        task: &InFlightTask,
        task_end: Instant,
        step_start: Instant,
        step_end: Instant,
    ) {
        let eqt = expected_queueing_time_from_task(task.start, task_end, step_start, step_end);
        self.step_expected_queueing_time += eqt;
        self.split.add(task.kind, eqt);
    }

    fn finish_step(&mut self, client: &mut dyn QueueingTimeClient, step_start: Instant) {
        self.step_queueing_times.add(self.step_expected_queueing_time);
        let report = WindowReport {
            queueing_time: self.step_queueing_times.average(),
            step_start,
            is_disjoint_window: self.step_queueing_times.index_is_zero(),
        };
        trace!(
            "Step finished: step EQT {:?}, window EQT {:?}",
            self.step_expected_queueing_time, report.queueing_time
        );
        client.on_queueing_time_for_window_estimated(&report);
        self.split.end_step(report.is_disjoint_window, client);

        self.step_expected_queueing_time = Duration::ZERO;
        self.stats.steps_reported += 1;
    }

    fn current_step_excluded(&self) -> bool {
        self.step_start
            .is_some_and(|start| self.excluded.overlap(start, start + self.step_width).is_some())
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Expected queueing time estimator for one thread
pub struct QueueingTimeEstimator<C: QueueingTimeClient> {
    client: C,
    config: EstimatorConfig,
    state: EstimatorState,
}

impl<C: QueueingTimeClient> QueueingTimeEstimator<C> {
    /// Create an estimator reporting to `client`
    pub fn new(client: C, config: EstimatorConfig) -> Result<Self> {
        config.validate()?;
        let state = EstimatorState::new(&config);
        Ok(Self {
            client,
            config,
            state,
        })
    }

    /// A top-level task started running
    pub fn on_top_level_task_started(&mut self, at: Instant, kind: TaskQueueKind) -> Result<()> {
        self.state.on_top_level_task_started(at, kind)?;
        Ok(())
    }

    /// The running task ended
    pub fn on_top_level_task_completed(&mut self, at: Instant) -> Result<()> {
        self.state
            .on_top_level_task_completed(&mut self.client, at)?;
        Ok(())
    }

    /// The running task entered a nested run loop
    pub fn on_begin_nested_run_loop(&mut self) -> Result<()> {
        self.state.on_begin_nested_run_loop()?;
        Ok(())
    }

    /// The renderer moved to or from the background
    pub fn on_renderer_state_changed(&mut self, backgrounded: bool, at: Instant) {
        self.state.on_renderer_state_changed(backgrounded, at);
    }

    /// Queueing time right now, counting the task still running.
    ///
    /// Pretends the in-flight task (or a zero-length one) ends at `now` on a
    /// copy of the state, and returns the larger of the last finished window
    /// and the window that would end with the current partial step.
    pub fn estimate_queueing_time_including_current_task(&self, now: Instant) -> Result<Duration> {
        let finalized = self.state.step_queueing_times.average();

        let mut state = self.state.clone();
        let mut recorder = RecordingClient::new();
        if state.current_task.is_none() {
            state.on_top_level_task_started(now, TaskQueueKind::Other)?;
        }
        state.on_top_level_task_completed(&mut recorder, now)?;

        let last_window = recorder
            .last_report()
            .map_or(finalized, |report| report.queueing_time.max(finalized));
        let partial_window = if state.current_step_excluded() {
            state.step_queueing_times.average()
        } else {
            state
                .step_queueing_times
                .average_with(state.step_expected_queueing_time)
        };

        Ok(last_window.max(partial_window))
    }

    /// Current average over the finished steps of the window
    pub fn window_average(&self) -> Duration {
        self.state.step_queueing_times.average()
    }

    pub fn stats(&self) -> EstimatorStats {
        self.state.stats
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn is_backgrounded(&self) -> bool {
        self.state.backgrounded
    }

    pub fn is_task_in_flight(&self) -> bool {
        self.state.current_task.is_some()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::EstimatorError;
    use mockall::mock;

    mock! {
        Client {}
        impl QueueingTimeClient for Client {
            fn on_queueing_time_for_window_estimated(&mut self, report: &WindowReport);
            fn on_split_queueing_time_estimated(&mut self, kind: TaskQueueKind, queueing_time: Duration);
        }
    }

    fn estimator(window_ms: u64, steps: usize) -> QueueingTimeEstimator<RecordingClient> {
        let config = EstimatorConfig::new(Duration::from_millis(window_ms), steps).unwrap();
        QueueingTimeEstimator::new(RecordingClient::new(), config).unwrap()
    }

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_rejects_double_start() {
        let base = Instant::now();
        let mut est = estimator(1000, 1);
        est.on_top_level_task_started(base, TaskQueueKind::Default)
            .unwrap();
        let err = est
            .on_top_level_task_started(base, TaskQueueKind::Default)
            .unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::Task(TaskEventError::TaskAlreadyRunning)
        ));
    }

    #[test]
    fn test_rejects_completion_without_task() {
        let mut est = estimator(1000, 1);
        let err = est.on_top_level_task_completed(Instant::now()).unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::Task(TaskEventError::NoTaskInFlight)
        ));
        assert!(est.on_begin_nested_run_loop().is_err());
    }

    #[test]
    fn test_rejects_backwards_completion() {
        let base = Instant::now();
        let mut est = estimator(1000, 1);
        est.on_top_level_task_started(at(base, 500), TaskQueueKind::Default)
            .unwrap();
        let err = est.on_top_level_task_completed(base).unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::Task(TaskEventError::TimeWentBackwards(_))
        ));
        // The task is still running and can complete properly.
        assert!(est.is_task_in_flight());
        est.on_top_level_task_completed(at(base, 600)).unwrap();
        assert!(!est.is_task_in_flight());
    }

    #[test]
    fn test_first_task_anchors_steps() {
        let base = Instant::now();
        let mut est = estimator(1000, 1);
        est.on_top_level_task_started(at(base, 250), TaskQueueKind::Default)
            .unwrap();
        est.on_top_level_task_completed(at(base, 1250)).unwrap();

        let reports = est.client().window_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].step_start, at(base, 250));
        assert_eq!(reports[0].queueing_time, Duration::from_millis(500));
    }

    #[test]
    fn test_redundant_state_change_is_ignored() {
        let base = Instant::now();
        let mut est = estimator(1000, 1);
        est.on_renderer_state_changed(false, base);
        assert!(!est.is_backgrounded());
        est.on_renderer_state_changed(true, base);
        est.on_renderer_state_changed(true, at(base, 10));
        assert!(est.is_backgrounded());
    }

    #[test]
    fn test_long_background_is_skipped_in_one_jump() {
        let base = Instant::now();
        let mut est = estimator(1000, 1);
        est.on_top_level_task_started(base, TaskQueueKind::Default)
            .unwrap();
        est.on_top_level_task_completed(base).unwrap();

        est.on_renderer_state_changed(true, at(base, 500));
        est.on_renderer_state_changed(false, at(base, 3_600_500));
        est.on_top_level_task_started(at(base, 3_601_000), TaskQueueKind::Default)
            .unwrap();
        est.on_top_level_task_completed(at(base, 3_601_000)).unwrap();

        let stats = est.stats();
        assert_eq!(stats.steps_reported, 0);
        assert_eq!(stats.steps_skipped, 3601);
        assert!(est.client().window_reports().is_empty());
    }

    #[test]
    fn test_skipped_step_never_reaches_client() {
        let base = Instant::now();
        let config = EstimatorConfig::new(Duration::from_millis(1000), 1).unwrap();
        let skipped = at(base, 1000);
        let mut client = MockClient::new();
        // Step [1000, 2000) is fully backgrounded.
        client
            .expect_on_queueing_time_for_window_estimated()
            .withf(move |report| report.step_start != skipped)
            .times(3)
            .return_const(());
        client
            .expect_on_split_queueing_time_estimated()
            .return_const(());

        let mut est = QueueingTimeEstimator::new(client, config).unwrap();
        est.on_top_level_task_started(base, TaskQueueKind::Default)
            .unwrap();
        est.on_top_level_task_completed(at(base, 200)).unwrap();
        est.on_renderer_state_changed(true, at(base, 1000));
        est.on_top_level_task_started(at(base, 1200), TaskQueueKind::Default)
            .unwrap();
        est.on_top_level_task_completed(at(base, 1800)).unwrap();
        est.on_renderer_state_changed(false, at(base, 2000));
        est.on_top_level_task_started(at(base, 2500), TaskQueueKind::Default)
            .unwrap();
        est.on_top_level_task_completed(at(base, 4000)).unwrap();

        assert_eq!(est.stats().steps_skipped, 1);
    }

    #[test]
    fn test_estimate_does_not_touch_state() {
        let base = Instant::now();
        let mut est = estimator(5000, 1);
        est.on_top_level_task_started(base, TaskQueueKind::Default)
            .unwrap();

        let eqt = est
            .estimate_queueing_time_including_current_task(at(base, 12_000))
            .unwrap();

        assert_eq!(eqt, Duration::from_millis(4500));
        assert!(est.is_task_in_flight());
        assert!(est.client().window_reports().is_empty());
        assert_eq!(est.stats(), EstimatorStats::default());
    }

    #[test]
    fn test_estimate_ignores_backgrounded_partial_step() {
        let base = Instant::now();
        let mut est = estimator(1000, 1);
        est.on_top_level_task_started(base, TaskQueueKind::Default)
            .unwrap();
        est.on_top_level_task_completed(base).unwrap();
        est.on_renderer_state_changed(true, at(base, 100));
        est.on_top_level_task_started(at(base, 200), TaskQueueKind::Default)
            .unwrap();

        let eqt = est
            .estimate_queueing_time_including_current_task(at(base, 900))
            .unwrap();
        assert_eq!(eqt, Duration::ZERO);
    }

    #[test]
    fn test_estimate_ignores_nested_task() {
        let base = Instant::now();
        let mut est = estimator(1000, 1);
        est.on_top_level_task_started(base, TaskQueueKind::Default)
            .unwrap();
        est.on_top_level_task_completed(base).unwrap();
        est.on_top_level_task_started(at(base, 100), TaskQueueKind::Default)
            .unwrap();
        est.on_begin_nested_run_loop().unwrap();

        let eqt = est
            .estimate_queueing_time_including_current_task(at(base, 900))
            .unwrap();
        assert_eq!(eqt, Duration::ZERO);
    }
}

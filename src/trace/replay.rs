//! Replays a trace through an estimator

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, Instant};

use log::{debug, info};

use super::event::{TraceEvent, parse_line};
use crate::scheduler::{
    EstimatorConfig, EstimatorStats, QueueingTimeEstimator, RecordingClient, TaskQueueKind,
};
use crate::utils::{EstimatorError, Result, TraceError};

/// A window report with its step start relative to the trace origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayedWindow {
    pub step_offset: Duration,
    pub queueing_time: Duration,
    pub is_disjoint_window: bool,
}

/// An on-demand estimate requested by the trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayedEstimate {
    pub at: Duration,
    pub queueing_time: Duration,
}

/// Everything a replay produced
#[derive(Debug, Clone, Default)]
pub struct ReplaySummary {
    pub windows: Vec<ReplayedWindow>,
    pub splits: Vec<(TaskQueueKind, Duration)>,
    pub estimates: Vec<ReplayedEstimate>,
    pub stats: EstimatorStats,
    pub events: usize,
}

impl ReplaySummary {
    /// Reported window averages, in order
    pub fn queueing_times(&self) -> Vec<Duration> {
        self.windows.iter().map(|w| w.queueing_time).collect()
    }

    /// Highest reported window average
    pub fn max_queueing_time(&self) -> Duration {
        self.windows
            .iter()
            .map(|w| w.queueing_time)
            .max()
            .unwrap_or_default()
    }
}

/// Replay a JSON-lines trace read from `reader`
pub fn replay<R: BufRead>(reader: R, config: EstimatorConfig) -> Result<ReplaySummary> {
    let origin = Instant::now();
    let mut estimator = QueueingTimeEstimator::new(RecordingClient::new(), config)?;
    let mut estimates = Vec::new();
    let mut events = 0;

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;
        let Some(parsed) = parse_line(&line) else {
            continue;
        };
        let event = parsed.map_err(|source| TraceError::Parse {
            line: line_no,
            source,
        })?;
        events += 1;

        let at = |ms: u64| origin + Duration::from_millis(ms);
        let outcome = match event {
            TraceEvent::TaskStarted { at_ms, queue } => {
                estimator.on_top_level_task_started(at(at_ms), queue)
            }
            TraceEvent::TaskCompleted { at_ms } => estimator.on_top_level_task_completed(at(at_ms)),
            TraceEvent::NestedRunLoop => estimator.on_begin_nested_run_loop(),
            TraceEvent::BackgroundChanged {
                at_ms,
                backgrounded,
            } => {
                estimator.on_renderer_state_changed(backgrounded, at(at_ms));
                Ok(())
            }
            TraceEvent::Estimate { at_ms } => estimator
                .estimate_queueing_time_including_current_task(at(at_ms))
                .map(|queueing_time| {
                    debug!("Estimate at {}ms: {:?}", at_ms, queueing_time);
                    estimates.push(ReplayedEstimate {
                        at: Duration::from_millis(at_ms),
                        queueing_time,
                    });
                }),
        };

        match outcome {
            Ok(()) => {}
            Err(EstimatorError::Task(source)) => {
                return Err(TraceError::Event {
                    line: line_no,
                    source,
                }
                .into());
            }
            Err(other) => return Err(other),
        }
    }

    let stats = estimator.stats();
    let client = estimator.into_client();
    let windows = client
        .window_reports()
        .iter()
        .map(|report| ReplayedWindow {
            step_offset: report.step_start - origin,
            queueing_time: report.queueing_time,
            is_disjoint_window: report.is_disjoint_window,
        })
        .collect();

    info!(
        "Replayed {} events: {} steps reported, {} skipped",
        events, stats.steps_reported, stats.steps_skipped
    );

    Ok(ReplaySummary {
        windows,
        splits: client.split_reports().to_vec(),
        estimates,
        stats,
        events,
    })
}

/// Replay a trace file
pub fn replay_file(path: impl AsRef<Path>, config: EstimatorConfig) -> Result<ReplaySummary> {
    let file = File::open(path)?;
    replay(BufReader::new(file), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(window_ms: u64, steps: usize) -> EstimatorConfig {
        EstimatorConfig::new(Duration::from_millis(window_ms), steps).unwrap()
    }

    #[test]
    fn test_replay_single_window() {
        let trace = r#"
# three one-second tasks in a five second window
{"event":"task_started","at_ms":0}
{"event":"task_completed","at_ms":1000}
{"event":"task_started","at_ms":1000}
{"event":"task_completed","at_ms":2000}
{"event":"task_started","at_ms":2000}
{"event":"task_completed","at_ms":3000}
{"event":"task_started","at_ms":8000}
{"event":"task_completed","at_ms":8500}
"#;
        let summary = replay(trace.as_bytes(), config(5000, 1)).unwrap();

        assert_eq!(summary.events, 8);
        assert_eq!(summary.queueing_times(), vec![Duration::from_millis(300)]);
        assert_eq!(summary.windows[0].step_offset, Duration::ZERO);
        assert_eq!(summary.stats.tasks_completed, 4);
    }

    #[test]
    fn test_replay_records_estimates() {
        let trace = r#"
{"event":"task_started","at_ms":5000}
{"event":"task_completed","at_ms":5000}
{"event":"task_started","at_ms":5000}
{"event":"estimate","at_ms":8000}
"#;
        let summary = replay(trace.as_bytes(), config(5000, 1)).unwrap();
        assert_eq!(
            summary.estimates,
            vec![ReplayedEstimate {
                at: Duration::from_millis(8000),
                queueing_time: Duration::from_millis(900),
            }]
        );
    }

    #[test]
    fn test_parse_error_reports_line() {
        let trace = "{\"event\":\"task_started\",\"at_ms\":0}\n{oops}\n";
        let err = replay(trace.as_bytes(), config(1000, 1)).unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::Trace(TraceError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_event_error_reports_line() {
        let trace = "\n{\"event\":\"task_completed\",\"at_ms\":10}\n";
        let err = replay(trace.as_bytes(), config(1000, 1)).unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::Trace(TraceError::Event { line: 2, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = replay_file("/nonexistent/trace.jsonl", config(1000, 1)).unwrap_err();
        assert!(matches!(err, EstimatorError::Io(_)));
    }
}

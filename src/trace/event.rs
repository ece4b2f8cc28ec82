//! Trace file events

use serde::Deserialize;

use crate::scheduler::TaskQueueKind;

/// One line of a JSON-lines trace. Times are milliseconds from an arbitrary
/// origin shared by the whole trace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    TaskStarted {
        at_ms: u64,
        #[serde(default)]
        queue: TaskQueueKind,
    },
    TaskCompleted {
        at_ms: u64,
    },
    NestedRunLoop,
    BackgroundChanged {
        at_ms: u64,
        backgrounded: bool,
    },
    Estimate {
        at_ms: u64,
    },
}

/// Parse one trace line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Option<serde_json::Result<TraceEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(serde_json::from_str(line))
}

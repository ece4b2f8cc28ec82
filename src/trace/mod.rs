//! Offline replay of recorded scheduler traces
//!
//! A trace is a JSON-lines file, one event per line:
//!
//! ```text
//! {"event":"task_started","at_ms":5000,"queue":"default"}
//! {"event":"task_completed","at_ms":5500}
//! {"event":"nested_run_loop"}
//! {"event":"background_changed","at_ms":6000,"backgrounded":true}
//! {"event":"estimate","at_ms":7000}
//! ```

mod event;
mod replay;

pub use event::{TraceEvent, parse_line};
pub use replay::{ReplaySummary, ReplayedEstimate, ReplayedWindow, replay, replay_file};

//! Time spans excluded from reporting
//!
//! Steps overlapping a span (renderer backgrounded, nested run loop) are
//! skipped rather than estimated, so a reported window may be made of
//! non-contiguous steps.

use std::collections::VecDeque;
use std::time::Instant;

/// A `[start, end)` span; `end` is `None` while still open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Instant,
    pub end: Option<Instant>,
}

impl Span {
    fn overlaps(&self, from: Instant, to: Instant) -> bool {
        self.start < to && self.end.is_none_or(|end| end > from)
    }
}

/// Ordered set of excluded spans
#[derive(Debug, Clone, Default)]
pub struct ExcludedSpans {
    spans: VecDeque<Span>,
}

impl ExcludedSpans {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a span at `at`. Does nothing if one is already open.
    pub fn begin(&mut self, at: Instant) {
        if self.is_open() {
            return;
        }
        self.insert(Span {
            start: at,
            end: None,
        });
    }

    /// Close the open span. Empty spans are dropped.
    pub fn end(&mut self, at: Instant) {
        let Some(pos) = self.spans.iter().position(|s| s.end.is_none()) else {
            return;
        };
        if at <= self.spans[pos].start {
            self.spans.remove(pos);
        } else {
            self.spans[pos].end = Some(at);
        }
    }

    /// Record a finished span
    pub fn push_closed(&mut self, start: Instant, end: Instant) {
        if end > start {
            self.insert(Span {
                start,
                end: Some(end),
            });
        }
    }

    /// Whether a span is currently open
    pub fn is_open(&self) -> bool {
        self.spans.iter().any(|s| s.end.is_none())
    }

    /// End of the first span overlapping `[from, to)`.
    ///
    /// Returns `Some(None)` when the overlapping span is still open.
    pub fn overlap(&self, from: Instant, to: Instant) -> Option<Option<Instant>> {
        self.spans
            .iter()
            .find(|s| s.overlaps(from, to))
            .map(|s| s.end)
    }

    /// Forget spans that ended at or before `before`
    pub fn prune(&mut self, before: Instant) {
        self.spans.retain(|s| s.end.is_none_or(|end| end > before));
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    fn insert(&mut self, span: Span) {
        let pos = self
            .spans
            .iter()
            .position(|s| s.start > span.start)
            .unwrap_or(self.spans.len());
        self.spans.insert(pos, span);
    }
}

use std::time::{Duration, Instant};

/// A filter that can be applied to log lines
///
/// Matching is a case-insensitive substring test against the raw line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineFilter {
    /// The term as the user typed it
    pub term: String,
    lowered: String,
}

impl LineFilter {
    /// Build a filter from user input; empty input means no filter.
    pub fn new(term: &str) -> Option<Self> {
        if term.is_empty() {
            None
        } else {
            Some(Self {
                term: term.to_string(),
                lowered: term.to_lowercase(),
            })
        }
    }

    /// Check if a line matches this filter
    pub fn matches(&self, line: &str) -> bool {
        line.to_lowercase().contains(&self.lowered)
    }
}

/// Debounce state for the filter input box.
///
/// Edits are recorded with a timestamp; `tick` reports the settled text
/// once the quiet period has passed. Time is passed in by the caller so
/// the debounce is testable without real timers.
pub struct FilterInput {
    pending: Option<String>,
    last_change: Option<Instant>,
    debounce: Duration,
}

impl FilterInput {
    pub fn new(debounce: Duration) -> Self {
        Self {
            pending: None,
            last_change: None,
            debounce,
        }
    }

    /// Record an edit to the filter text.
    pub fn changed(&mut self, text: String, now: Instant) {
        self.pending = Some(text);
        self.last_change = Some(now);
    }

    /// Drop any pending edit without applying it.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.last_change = None;
    }

    /// Returns the settled filter text once the debounce window has
    /// passed, at most once per edit.
    pub fn tick(&mut self, now: Instant) -> Option<String> {
        let last = self.last_change?;
        if now.duration_since(last) >= self.debounce {
            self.last_change = None;
            self.pending.take()
        } else {
            None
        }
    }
}

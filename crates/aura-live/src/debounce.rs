//! Filter text debouncing
//!
//! Keystrokes only update the pending value and restart the settle timer.
//! The value is handed out once, after it has been left alone for the full
//! settle time, so the filtered view is recomputed at most once per pause in
//! typing regardless of how fast the user types.

use std::time::Duration;

use tokio::time::Instant;

/// Default settle time for filter edits (ms)
pub const FILTER_SETTLE_MS: u64 = 200;

/// Pending filter edit
#[derive(Debug, Clone)]
struct PendingEdit {
    text: String,
    deadline: Instant,
}

/// Debounces filter text edits
#[derive(Debug, Clone)]
pub struct FilterDebouncer {
    settle: Duration,
    pending: Option<PendingEdit>,
}

impl FilterDebouncer {
    /// Create a debouncer with the given settle time
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            pending: None,
        }
    }

    /// Record an edit made at `now`, restarting the settle timer
    pub fn edit(&mut self, text: impl Into<String>, now: Instant) {
        self.pending = Some(PendingEdit {
            text: text.into(),
            deadline: now + self.settle,
        });
    }

    /// When the pending edit settles, if there is one
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Text of the edit waiting to settle
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.text.as_str())
    }

    /// Whether an edit is waiting to settle
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending text if it has settled by `now`
    pub fn take_settled(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some(pending) if now >= pending.deadline => self.pending.take().map(|p| p.text),
            _ => None,
        }
    }

    /// Drop the pending edit without applying it
    ///
    /// Returns true if an edit was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }
}

impl Default for FilterDebouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(FILTER_SETTLE_MS))
    }
}

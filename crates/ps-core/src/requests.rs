//! Per-document resource request log
//!
//! Written from the resource-fetch thread, read from the UI thread.
//! Counters are atomics; the outcome list sits behind a short mutex.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

use crate::types::{Blocker, RequestVerdict};

/// One terminal chain decision. Never changed after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestOutcome {
    pub verdict: RequestVerdict,
    /// List (or the third-party setting) that decided the verdict
    pub blocker: Option<Blocker>,
    /// Text of the deciding rule
    pub rule: Option<String>,
    pub url: String,
}

#[derive(Debug, Default)]
pub struct RequestLog {
    outcomes: Mutex<Vec<RequestOutcome>>,
    blocked_total: AtomicU32,
    blocked_by: [AtomicU32; Blocker::COUNT],
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome, counting it if it blocked something.
    pub fn record(&self, outcome: RequestOutcome) {
        if outcome.verdict == RequestVerdict::Blocked {
            self.blocked_total.fetch_add(1, Ordering::Relaxed);
            if let Some(blocker) = outcome.blocker {
                self.blocked_by[blocker.counter_index()].fetch_add(1, Ordering::Relaxed);
            }
        }
        self.outcomes.lock().push(outcome);
    }

    pub fn blocked_count(&self) -> u32 {
        self.blocked_total.load(Ordering::Relaxed)
    }

    pub fn blocked_count_for(&self, blocker: Blocker) -> u32 {
        self.blocked_by[blocker.counter_index()].load(Ordering::Relaxed)
    }

    /// Snapshot of the outcomes so far, in decision order.
    pub fn outcomes(&self) -> Vec<RequestOutcome> {
        self.outcomes.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.outcomes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything; called when the document starts a new navigation.
    pub fn clear(&self) {
        self.outcomes.lock().clear();
        self.blocked_total.store(0, Ordering::Relaxed);
        for counter in &self.blocked_by {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

//! Shared drawing history.
//!
//! Wraps [`frames::HistoryLog`] in a mutex so the hub can append from every
//! connection task. Callers get owned snapshots; the lock never outlives a
//! single method call.

use std::sync::{Arc, Mutex, PoisonError};

use frames::{DrawAction, HistoryLog};
use tracing::debug;

#[derive(Clone)]
pub struct History {
    log: Arc<Mutex<HistoryLog>>,
}

impl History {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { log: Arc::new(Mutex::new(HistoryLog::new(capacity))) }
    }

    /// Append a finalized action. Never fails; evicts the oldest on overflow.
    pub fn append(&self, action: DrawAction) {
        let evicted = self.log.lock().unwrap_or_else(PoisonError::into_inner).append(action);
        if let Some(old) = evicted {
            debug!(timestamp = old.timestamp, "history: evicted oldest action");
        }
    }

    /// Drop every action, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        let removed = log.len();
        log.clear();
        removed
    }

    /// Owned copy, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DrawAction> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).snapshot()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;

//! Bounded FIFO log of finalized drawing actions.
//!
//! The server keeps one behind a mutex as the authoritative log; every canvas
//! keeps its own replica and replays it into the persistent layer. Appends
//! past capacity evict from the front, so the log always holds the most
//! recent `capacity` actions in arrival order.

use std::collections::VecDeque;

use crate::action::DrawAction;

/// Default number of retained actions.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: VecDeque<DrawAction>,
    capacity: usize,
}

impl HistoryLog {
    /// Create an empty log. A zero capacity is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)), capacity }
    }

    /// Append an action, returning the evicted oldest entry on overflow.
    pub fn append(&mut self, action: DrawAction) -> Option<DrawAction> {
        self.entries.push_back(action);
        if self.entries.len() > self.capacity {
            return self.entries.pop_front();
        }
        None
    }

    /// Drop every entry. Irreversible.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace the contents with `actions`, keeping only the newest `capacity`.
    pub fn replace(&mut self, actions: Vec<DrawAction>) {
        self.entries.clear();
        for action in actions {
            self.append(action);
        }
    }

    /// Owned copy in insertion order, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DrawAction> {
        self.entries.iter().cloned().collect()
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &DrawAction> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;

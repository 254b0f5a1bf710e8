//! Connection registry, the table of joined peers.
//!
//! DESIGN
//! ======
//! A `HashMap<Uuid, Peer>` behind a std `RwLock`. Every operation touches the
//! table once and releases the lock before returning, so callers never hold
//! it across an await or a send. `add` and `remove` return the affected peer;
//! the hub turns that return value into roster notifications.
//!
//! Roster order is join order. Join timestamps have millisecond resolution,
//! so a monotonic sequence number breaks ties.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use frames::Peer;
use frames::peer::PEER_PALETTE;
use rand::Rng;
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("peer already registered: {0}")]
    DuplicateId(Uuid),
    #[error("display name must not be blank")]
    BlankName,
}

struct Entry {
    seq: u64,
    peer: Peer,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    peers: HashMap<Uuid, Entry>,
}

#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<Inner>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer under `id` with a trimmed display name and a palette color.
    ///
    /// # Errors
    ///
    /// [`RegistryError::BlankName`] when the name is empty after trimming,
    /// [`RegistryError::DuplicateId`] when `id` is already registered.
    pub fn add(&self, id: Uuid, display_name: &str) -> Result<Peer, RegistryError> {
        let name = display_name.trim();
        if name.is_empty() {
            return Err(RegistryError::BlankName);
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.peers.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }

        let peer = Peer {
            id,
            name: name.to_owned(),
            color: pick_color().to_owned(),
            joined_at: frames::now_ms(),
            active: true,
        };
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.peers.insert(id, Entry { seq, peer: peer.clone() });
        Ok(peer)
    }

    /// Remove a peer, returning it if it was registered.
    pub fn remove(&self, id: Uuid) -> Option<Peer> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.peers.remove(&id).map(|entry| Peer { active: false, ..entry.peer })
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Peer> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.peers.get(&id).map(|entry| entry.peer.clone())
    }

    /// Every registered peer in join order.
    #[must_use]
    pub fn list_active(&self) -> Vec<Peer> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<&Entry> = inner.peers.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.peer.clone()).collect()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).peers.len()
    }
}

fn pick_color() -> &'static str {
    let idx = rand::rng().random_range(0..PEER_PALETTE.len());
    PEER_PALETTE[idx]
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

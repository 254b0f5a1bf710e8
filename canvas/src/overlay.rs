//! Overlay state: remote cursors, laser pointers with trails, and shape previews.
//!
//! Overlays are ephemeral. Each record is keyed by the peer that produced it,
//! replaced wholesale on every update, and stamped with the local time it was
//! last seen. Nothing here ever expires on its own: [`OverlayMap::live`]
//! filters stale records at read time and [`OverlayMap::prune`] drops them so
//! the maps stay bounded by the set of recently active peers.
//!
//! Records keep the position of their first insert. A peer whose cursor is
//! updated a hundred times a second does not jump to the top of the stack.

#[cfg(test)]
#[path = "overlay_test.rs"]
mod overlay_test;

use std::collections::{HashMap, VecDeque};

use frames::DrawAction;
use uuid::Uuid;

use crate::consts::{CURSOR_TTL_MS, LASER_TTL_MS, PREVIEW_TTL_MS, TRAIL_CAPACITY, TRAIL_MAX_AGE_MS};

/// Identifier of the peer that owns an overlay record.
pub type PeerId = Uuid;

/// Lifetimes and trail limits for the three overlay kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayConfig {
    pub cursor_ttl_ms: i64,
    pub preview_ttl_ms: i64,
    pub laser_ttl_ms: i64,
    pub trail_capacity: usize,
    pub trail_max_age_ms: i64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            cursor_ttl_ms: CURSOR_TTL_MS,
            preview_ttl_ms: PREVIEW_TTL_MS,
            laser_ttl_ms: LASER_TTL_MS,
            trail_capacity: TRAIL_CAPACITY,
            trail_max_age_ms: TRAIL_MAX_AGE_MS,
        }
    }
}

/// A record that knows when it was last refreshed.
pub trait Expiring {
    /// Local time of the last update, milliseconds since the Unix epoch.
    fn last_seen(&self) -> i64;

    /// Whether the record is still within `ttl_ms` of `now`.
    fn is_live(&self, now: i64, ttl_ms: i64) -> bool {
        now - self.last_seen() <= ttl_ms
    }
}

// =============================================================
// Records
// =============================================================

/// A remote peer's pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorRecord {
    pub peer_id: PeerId,
    pub x: f64,
    pub y: f64,
    /// Display name shown in the label.
    pub name: String,
    /// The peer's identity color.
    pub color: String,
    pub last_seen: i64,
}

impl Expiring for CursorRecord {
    fn last_seen(&self) -> i64 {
        self.last_seen
    }
}

/// One sampled laser position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub x: f64,
    pub y: f64,
    /// Local time the point was sampled.
    pub at: i64,
}

/// A visible piece of a laser trail, between two consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSegment {
    pub from: TrailPoint,
    pub to: TrailPoint,
    /// `1.0` for a fresh segment, falling linearly to `0.0` at the trail max age.
    pub opacity: f64,
}

/// A laser pointer and the recent path it traced.
#[derive(Debug, Clone, PartialEq)]
pub struct LaserRecord {
    pub peer_id: PeerId,
    pub x: f64,
    pub y: f64,
    /// Ink color of the laser itself.
    pub color: String,
    /// Display name shown in the label.
    pub name: String,
    /// The peer's identity color, used for the label.
    pub peer_color: String,
    /// Oldest sample first. Never longer than the configured capacity.
    pub trail: VecDeque<TrailPoint>,
    pub last_seen: i64,
}

impl LaserRecord {
    #[must_use]
    pub fn new(peer_id: PeerId, name: impl Into<String>, peer_color: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            peer_id,
            x: 0.0,
            y: 0.0,
            color: color.into(),
            name: name.into(),
            peer_color: peer_color.into(),
            trail: VecDeque::new(),
            last_seen: 0,
        }
    }

    /// Move the pointer to `(x, y)` and record the sample on the trail,
    /// dropping the oldest samples beyond `capacity`.
    pub fn advance(&mut self, x: f64, y: f64, now: i64, capacity: usize) {
        self.x = x;
        self.y = y;
        self.last_seen = now;
        self.trail.push_back(TrailPoint { x, y, at: now });
        while self.trail.len() > capacity {
            self.trail.pop_front();
        }
    }

    /// Trail segments that have not fully faded by `now`.
    ///
    /// A segment's opacity is `max(0, 1 - age / max_age)` where age is
    /// measured from its newer endpoint.
    #[must_use]
    pub fn visible_trail(&self, now: i64, max_age_ms: i64) -> Vec<TrailSegment> {
        if max_age_ms <= 0 {
            return Vec::new();
        }
        #[allow(clippy::cast_precision_loss)]
        let max_age = max_age_ms as f64;
        self.trail
            .iter()
            .zip(self.trail.iter().skip(1))
            .filter_map(|(from, to)| {
                #[allow(clippy::cast_precision_loss)]
                let age = (now - to.at) as f64;
                let opacity = (1.0 - age / max_age).clamp(0.0, 1.0);
                (opacity > 0.0).then_some(TrailSegment { from: *from, to: *to, opacity })
            })
            .collect()
    }
}

impl Expiring for LaserRecord {
    fn last_seen(&self) -> i64 {
        self.last_seen
    }
}

/// A remote peer's in-progress shape.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRecord {
    pub peer_id: PeerId,
    /// Tool, geometry and style of the shape as it would be committed.
    pub action: DrawAction,
    pub last_seen: i64,
}

impl Expiring for PreviewRecord {
    fn last_seen(&self) -> i64 {
        self.last_seen
    }
}

// =============================================================
// OverlayMap
// =============================================================

struct Slot<R> {
    seq: u64,
    record: R,
}

/// Records keyed by peer, iterated in order of first insert.
pub struct OverlayMap<R> {
    next_seq: u64,
    slots: HashMap<PeerId, Slot<R>>,
}

impl<R> Default for OverlayMap<R> {
    fn default() -> Self {
        Self { next_seq: 0, slots: HashMap::new() }
    }
}

impl<R: Expiring> OverlayMap<R> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the peer's record, keeping its stacking position if it had one.
    pub fn upsert(&mut self, peer_id: PeerId, record: R) {
        if let Some(slot) = self.slots.get_mut(&peer_id) {
            slot.record = record;
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.insert(peer_id, Slot { seq, record });
    }

    /// The peer's record, inserting one built by `make` if absent.
    pub fn entry(&mut self, peer_id: PeerId, make: impl FnOnce() -> R) -> &mut R {
        let next_seq = &mut self.next_seq;
        let slot = self.slots.entry(peer_id).or_insert_with(|| {
            let seq = *next_seq;
            *next_seq += 1;
            Slot { seq, record: make() }
        });
        &mut slot.record
    }

    #[must_use]
    pub fn get(&self, peer_id: &PeerId) -> Option<&R> {
        self.slots.get(peer_id).map(|slot| &slot.record)
    }

    pub fn remove(&mut self, peer_id: &PeerId) -> Option<R> {
        self.slots.remove(peer_id).map(|slot| slot.record)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Records seen within `ttl_ms` of `now`, in order of first insert.
    #[must_use]
    pub fn live(&self, now: i64, ttl_ms: i64) -> Vec<&R> {
        let mut slots: Vec<&Slot<R>> = self.slots.values().filter(|slot| slot.record.is_live(now, ttl_ms)).collect();
        slots.sort_by_key(|slot| slot.seq);
        slots.into_iter().map(|slot| &slot.record).collect()
    }

    /// Drop records older than `ttl_ms`. Returns how many were dropped.
    pub fn prune(&mut self, now: i64, ttl_ms: i64) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| slot.record.is_live(now, ttl_ms));
        before - self.slots.len()
    }
}

// =============================================================
// OverlayStore
// =============================================================

/// The three overlay maps plus the limits that govern them.
#[derive(Default)]
pub struct OverlayStore {
    config: OverlayConfig,
    cursors: OverlayMap<CursorRecord>,
    lasers: OverlayMap<LaserRecord>,
    previews: OverlayMap<PreviewRecord>,
}

impl OverlayStore {
    #[must_use]
    pub fn new(config: OverlayConfig) -> Self {
        Self { config, ..Self::default() }
    }

    #[must_use]
    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn upsert_cursor(&mut self, peer_id: PeerId, x: f64, y: f64, name: &str, color: &str, now: i64) {
        self.cursors.upsert(
            peer_id,
            CursorRecord { peer_id, x, y, name: name.to_owned(), color: color.to_owned(), last_seen: now },
        );
    }

    /// Move the peer's laser, extending its trail. Identity fields are
    /// refreshed on every sample so a late name change is picked up.
    pub fn upsert_laser(&mut self, peer_id: PeerId, x: f64, y: f64, ink: LaserInk<'_>, now: i64) {
        let capacity = self.config.trail_capacity;
        let laser = self
            .lasers
            .entry(peer_id, || LaserRecord::new(peer_id, ink.name, ink.peer_color, ink.color));
        ink.name.clone_into(&mut laser.name);
        ink.peer_color.clone_into(&mut laser.peer_color);
        ink.color.clone_into(&mut laser.color);
        laser.advance(x, y, now, capacity);
    }

    pub fn upsert_preview(&mut self, peer_id: PeerId, action: DrawAction, now: i64) {
        self.previews.upsert(peer_id, PreviewRecord { peer_id, action, last_seen: now });
    }

    pub fn remove_laser(&mut self, peer_id: &PeerId) -> Option<LaserRecord> {
        self.lasers.remove(peer_id)
    }

    /// Hand a laser over to a new owner, keeping its trail. Any laser the new
    /// owner already had is replaced.
    pub fn rekey_laser(&mut self, from: &PeerId, to: PeerId) {
        if let Some(mut laser) = self.lasers.remove(from) {
            laser.peer_id = to;
            self.lasers.upsert(to, laser);
        }
    }

    pub fn remove_preview(&mut self, peer_id: &PeerId) -> Option<PreviewRecord> {
        self.previews.remove(peer_id)
    }

    /// Drop every overlay the peer owns.
    pub fn remove_peer(&mut self, peer_id: &PeerId) {
        self.cursors.remove(peer_id);
        self.lasers.remove(peer_id);
        self.previews.remove(peer_id);
    }

    #[must_use]
    pub fn cursor(&self, peer_id: &PeerId) -> Option<&CursorRecord> {
        self.cursors.get(peer_id)
    }

    #[must_use]
    pub fn laser(&self, peer_id: &PeerId) -> Option<&LaserRecord> {
        self.lasers.get(peer_id)
    }

    #[must_use]
    pub fn preview(&self, peer_id: &PeerId) -> Option<&PreviewRecord> {
        self.previews.get(peer_id)
    }

    #[must_use]
    pub fn live_cursors(&self, now: i64) -> Vec<&CursorRecord> {
        self.cursors.live(now, self.config.cursor_ttl_ms)
    }

    #[must_use]
    pub fn live_lasers(&self, now: i64) -> Vec<&LaserRecord> {
        self.lasers.live(now, self.config.laser_ttl_ms)
    }

    #[must_use]
    pub fn live_previews(&self, now: i64) -> Vec<&PreviewRecord> {
        self.previews.live(now, self.config.preview_ttl_ms)
    }

    /// Drop expired records from all three maps.
    pub fn prune(&mut self, now: i64) -> usize {
        self.cursors.prune(now, self.config.cursor_ttl_ms)
            + self.lasers.prune(now, self.config.laser_ttl_ms)
            + self.previews.prune(now, self.config.preview_ttl_ms)
    }

    /// Total records held, live or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len() + self.lasers.len() + self.previews.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identity and color carried by a laser sample.
#[derive(Debug, Clone, Copy)]
pub struct LaserInk<'a> {
    pub color: &'a str,
    pub name: &'a str,
    pub peer_color: &'a str,
}

//! Compositor: merges server events into a local view and draws it in layers.
//!
//! DESIGN
//! ======
//! The compositor owns a replica of the board history, the overlay store, and
//! the local user's in-progress preview. Server events mutate that view via
//! [`Compositor::apply`]; a full redraw via [`Compositor::render`] happens on
//! every display tick regardless of whether anything changed.
//!
//! Layers, bottom to top:
//! 1. persistent history, oldest first
//! 2. the local in-progress preview
//! 3. remote previews
//! 4. laser trails, then laser points
//! 5. cursors
//!
//! Within a layer, overlays stack in the order their peer first appeared.
//! Drawing is delegated to a [`Surface`], so the layering discipline is
//! testable without a browser.

#[cfg(test)]
#[path = "compositor_test.rs"]
mod compositor_test;

use frames::{ActionKind, DrawAction, HistoryLog, Peer, ServerEvent};
use uuid::Uuid;

use crate::overlay::{CursorRecord, LaserInk, LaserRecord, OverlayConfig, OverlayStore, PreviewRecord, TrailSegment};

/// What a [`Surface`] is asked to draw above the persistent layer.
#[derive(Debug, Clone, Copy)]
pub enum Overlay<'a> {
    LocalPreview(&'a DrawAction),
    RemotePreview(&'a PreviewRecord),
    LaserTrail { laser: &'a LaserRecord, segments: &'a [TrailSegment] },
    /// `label` asks for the owner's name tag next to the pointer.
    LaserPoint { laser: &'a LaserRecord, label: bool },
    Cursor { cursor: &'a CursorRecord, label: bool },
}

/// The drawing collaborator. Implementations own the pixels; the compositor
/// only decides what goes where and in which order.
pub trait Surface {
    type Error;

    /// Reset the surface to an empty board.
    ///
    /// # Errors
    ///
    /// Implementation-defined drawing failures.
    fn clear_surface(&mut self) -> Result<(), Self::Error>;

    /// Draw one finalized action onto the board.
    ///
    /// # Errors
    ///
    /// Implementation-defined drawing failures.
    fn render_persistent_action(&mut self, action: &DrawAction) -> Result<(), Self::Error>;

    /// Draw one ephemeral overlay above the board.
    ///
    /// # Errors
    ///
    /// Implementation-defined drawing failures.
    fn render_overlay(&mut self, overlay: &Overlay<'_>) -> Result<(), Self::Error>;

    /// Convert viewport client coordinates into surface coordinates.
    fn local_coordinates(&self, client_x: f64, client_y: f64) -> (f64, f64);
}

/// Local view of the shared board.
pub struct Compositor {
    local_id: Option<Uuid>,
    local_peer: Option<Peer>,
    roster: Vec<Peer>,
    history: HistoryLog,
    overlays: OverlayStore,
    local_preview: Option<DrawAction>,
    show_labels: bool,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(OverlayConfig::default())
    }
}

impl Compositor {
    #[must_use]
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            local_id: None,
            local_peer: None,
            roster: Vec::new(),
            history: HistoryLog::default(),
            overlays: OverlayStore::new(config),
            local_preview: None,
            show_labels: true,
        }
    }

    // --- Server events ---

    /// Merge one server event into the view. `now` is the local clock in
    /// milliseconds and becomes the `last_seen` of any overlay it touches.
    pub fn apply(&mut self, event: ServerEvent, now: i64) {
        match event {
            ServerEvent::Connected { peer_id } => self.adopt_local_id(peer_id),
            ServerEvent::UserJoined { peer, .. } => {
                if Some(peer.id) == self.local_id {
                    self.local_peer = Some(peer);
                }
            }
            ServerEvent::Roster { peers } => self.roster = peers,
            ServerEvent::UserLeft { peer_id, .. } => {
                self.overlays.remove_peer(&peer_id);
                self.roster.retain(|peer| peer.id != peer_id);
            }
            ServerEvent::DrawReceived(action) => self.apply_remote_draw(action, now),
            ServerEvent::PreviewReceived(action) => {
                if let Some(author) = action.author_id {
                    self.overlays.upsert_preview(author, action, now);
                }
            }
            ServerEvent::CursorMoved(cursor) => {
                self.overlays.upsert_cursor(cursor.peer_id, cursor.x, cursor.y, &cursor.name, &cursor.color, now);
            }
            ServerEvent::Cleared { .. } => self.history.clear(),
            ServerEvent::HistorySnapshot { actions } => self.history.replace(actions),
        }
    }

    fn apply_remote_draw(&mut self, action: DrawAction, now: i64) {
        let author = action.author_id;
        if action.kind == ActionKind::Laser {
            let Some(author) = author else { return };
            if action.is_laser_end {
                self.overlays.remove_laser(&author);
            } else {
                let ink = LaserInk {
                    color: &action.color,
                    name: action.author_name.as_deref().unwrap_or_default(),
                    peer_color: action.author_color.as_deref().unwrap_or(&action.color),
                };
                self.overlays.upsert_laser(author, action.x, action.y, ink, now);
            }
            return;
        }

        // A committed shape supersedes the author's preview.
        if matches!(action.kind, ActionKind::Shape | ActionKind::Text) {
            if let Some(author) = author {
                self.overlays.remove_preview(&author);
            }
        }
        self.history.append(action);
    }

    // --- Local input ---

    /// Show (or hide, with `None`) the local user's in-progress shape.
    pub fn set_local_preview(&mut self, preview: Option<DrawAction>) {
        self.local_preview = preview;
    }

    /// Record an action the local user just sent. The hub never echoes a
    /// sender's own draws back, so the local view is updated here instead.
    pub fn commit_local(&mut self, mut action: DrawAction, now: i64) {
        action.normalize();
        if let Some(peer) = &self.local_peer {
            action.stamp(peer.id, &peer.name, &peer.color, now);
        }

        if action.kind == ActionKind::Laser {
            if action.is_laser_end {
                self.end_local_laser();
            } else {
                self.local_laser(action.x, action.y, &action.color, now);
            }
            return;
        }

        if matches!(action.kind, ActionKind::Shape | ActionKind::Text) {
            self.local_preview = None;
        }
        self.history.append(action);
    }

    /// Move the local user's laser pointer.
    pub fn local_laser(&mut self, x: f64, y: f64, color: &str, now: i64) {
        let key = self.local_key();
        let (name, peer_color) = self
            .local_peer
            .as_ref()
            .map_or(("", color), |peer| (peer.name.as_str(), peer.color.as_str()));
        self.overlays.upsert_laser(key, x, y, LaserInk { color, name, peer_color }, now);
    }

    pub fn end_local_laser(&mut self) {
        let key = self.local_key();
        self.overlays.remove_laser(&key);
    }

    /// Before the welcome frame arrives the local user has no id; the nil id
    /// stands in so a laser can still be shown.
    fn local_key(&self) -> Uuid {
        self.local_id.unwrap_or(Uuid::nil())
    }

    /// Record the local id. A laser drawn under the nil stand-in moves to it.
    fn adopt_local_id(&mut self, id: Uuid) {
        if self.local_id.is_none() {
            self.overlays.rekey_laser(&Uuid::nil(), id);
        }
        self.local_id = Some(id);
    }

    // --- Queries ---

    #[must_use]
    pub fn local_id(&self) -> Option<Uuid> {
        self.local_id
    }

    #[must_use]
    pub fn local_peer(&self) -> Option<&Peer> {
        self.local_peer.as_ref()
    }

    pub fn set_local_peer(&mut self, peer: Peer) {
        self.adopt_local_id(peer.id);
        self.local_peer = Some(peer);
    }

    #[must_use]
    pub fn roster(&self) -> &[Peer] {
        &self.roster
    }

    pub fn set_roster(&mut self, peers: Vec<Peer>) {
        self.roster = peers;
    }

    #[must_use]
    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn replace_history(&mut self, actions: Vec<DrawAction>) {
        self.history.replace(actions);
    }

    #[must_use]
    pub fn overlays(&self) -> &OverlayStore {
        &self.overlays
    }

    #[must_use]
    pub fn local_preview(&self) -> Option<&DrawAction> {
        self.local_preview.as_ref()
    }

    #[must_use]
    pub fn show_labels(&self) -> bool {
        self.show_labels
    }

    /// Show or hide the name tags on cursors and laser pointers.
    pub fn set_show_labels(&mut self, show: bool) {
        self.show_labels = show;
    }

    // --- Render ---

    /// Redraw every layer, then drop overlays that have expired.
    ///
    /// # Errors
    ///
    /// Returns the first error the surface reports. Layers above the failing
    /// draw are skipped for this tick.
    pub fn render<S: Surface>(&mut self, surface: &mut S, now: i64) -> Result<(), S::Error> {
        surface.clear_surface()?;

        for action in self.history.iter() {
            surface.render_persistent_action(action)?;
        }

        if let Some(preview) = &self.local_preview {
            surface.render_overlay(&Overlay::LocalPreview(preview))?;
        }

        for preview in self.overlays.live_previews(now) {
            surface.render_overlay(&Overlay::RemotePreview(preview))?;
        }

        let lasers = self.overlays.live_lasers(now);
        let max_age = self.overlays.config().trail_max_age_ms;
        for &laser in &lasers {
            let segments = laser.visible_trail(now, max_age);
            if !segments.is_empty() {
                surface.render_overlay(&Overlay::LaserTrail { laser, segments: &segments })?;
            }
        }
        for &laser in &lasers {
            surface.render_overlay(&Overlay::LaserPoint { laser, label: self.show_labels })?;
        }

        for cursor in self.overlays.live_cursors(now) {
            surface.render_overlay(&Overlay::Cursor { cursor, label: self.show_labels })?;
        }

        self.overlays.prune(now);
        Ok(())
    }
}

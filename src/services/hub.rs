//! Session broadcast hub: the per-connection protocol state machine.
//!
//! DESIGN
//! ======
//! Each websocket task owns one [`Connection`] and calls the operations here
//! in arrival order. An operation validates against the connection state,
//! mutates the registry or history, fans events out to other connections,
//! and returns an [`Outcome`] describing the reply for the sender only.
//!
//! ```text
//! Connecting ──join──▶ Active ──disconnect──▶ Disconnected
//!      └──────────────disconnect─────────────────▲
//! ```
//!
//! The hub stores no cursor, laser, or preview state; those are pure relays
//! that observers expire on their own clock.
//!
//! ORDERING
//! ========
//! Fan-out uses `try_send` into each recipient's bounded channel. One
//! sender's events reach every recipient in the order the sender issued
//! them. There is no total order across senders. A full or closed channel
//! drops the frame for that recipient only.

use serde_json::json;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use frames::event::CursorMoved;
use frames::{DrawAction, Peer, ServerEvent};

use crate::frame::{Data, ErrorCode, Frame};
use crate::services::registry::RegistryError;
use crate::state::AppState;

/// Initiator name used when a clear comes from a connection that never joined.
const ANONYMOUS_INITIATOR: &str = "Someone";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Active(Peer),
    Disconnected,
}

/// One live websocket as seen by the hub.
#[derive(Debug)]
pub struct Connection {
    id: Uuid,
    state: ConnectionState,
    tx: mpsc::Sender<Frame>,
}

impl Connection {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    #[must_use]
    pub fn peer(&self) -> Option<&Peer> {
        match &self.state {
            ConnectionState::Active(peer) => Some(peer),
            _ => None,
        }
    }
}

/// Reply owed to the sender after an operation.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// No reply at all (cursor relay).
    Silent,
    /// Empty done.
    Done,
    /// Done carrying data.
    Reply(Data),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HubError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("peer already joined: {0}")]
    DuplicateId(Uuid),
    #[error("connection has not joined the session")]
    NotJoined,
    #[error("connection is disconnected")]
    Disconnected,
}

impl ErrorCode for HubError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "E_INVALID_INPUT",
            Self::DuplicateId(_) => "E_DUPLICATE_ID",
            Self::NotJoined => "E_NOT_JOINED",
            Self::Disconnected => "E_DISCONNECTED",
        }
    }
}

impl From<RegistryError> for HubError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateId(id) => Self::DuplicateId(id),
            RegistryError::BlankName => Self::InvalidInput(err.to_string()),
        }
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Register a fresh connection in `Connecting` state.
pub async fn connect(state: &AppState, tx: mpsc::Sender<Frame>) -> Connection {
    let id = Uuid::new_v4();
    state.clients.write().await.insert(id, tx.clone());
    Connection { id, state: ConnectionState::Connecting, tx }
}

/// Join the session under `display_name`.
///
/// Broadcasts `session:joined` and `session:roster` to every connection,
/// the joiner included. When replay is enabled the joiner also receives a
/// `history:snapshot`.
///
/// # Errors
///
/// `InvalidInput` for a blank name, `DuplicateId` if this connection already
/// joined, `Disconnected` after disconnect.
pub async fn join(state: &AppState, conn: &mut Connection, display_name: &str) -> Result<Outcome, HubError> {
    match &conn.state {
        ConnectionState::Connecting => {}
        ConnectionState::Active(_) => return Err(HubError::DuplicateId(conn.id)),
        ConnectionState::Disconnected => return Err(HubError::Disconnected),
    }

    let peer = state.registry.add(conn.id, display_name)?;
    conn.state = ConnectionState::Active(peer.clone());

    let roster = state.registry.list_active();
    let total = roster.len();
    info!(peer_id = %peer.id, name = %peer.name, color = %peer.color, total, "hub: peer joined");

    let from = peer.id.to_string();
    broadcast(state, &event_frame(&ServerEvent::UserJoined { peer: peer.clone(), total }, &from), None).await;
    broadcast(state, &event_frame(&ServerEvent::Roster { peers: roster.clone() }, &from), None).await;

    let mut reply = Data::new();
    reply.insert("peer".into(), json!(peer));
    reply.insert("roster".into(), json!(roster));

    if state.config.replay_on_join {
        let actions = state.history.snapshot();
        debug!(peer_id = %peer.id, count = actions.len(), "hub: replaying history to joiner");
        reply.insert("history".into(), json!(actions));
        deliver(conn.id, &conn.tx, Frame::event(&ServerEvent::HistorySnapshot { actions }));
    }

    Ok(Outcome::Reply(reply))
}

/// Tear the connection down. Idempotent.
///
/// A joined peer is removed from the registry and the remaining connections
/// get `session:left` and `session:roster`. A connection that never joined
/// leaves silently.
pub async fn disconnect(state: &AppState, conn: &mut Connection) {
    let previous = std::mem::replace(&mut conn.state, ConnectionState::Disconnected);
    if previous == ConnectionState::Disconnected {
        return;
    }

    state.clients.write().await.remove(&conn.id);

    let ConnectionState::Active(_) = previous else {
        debug!(connection_id = %conn.id, "hub: unjoined connection closed");
        return;
    };
    let Some(peer) = state.registry.remove(conn.id) else {
        return;
    };

    let roster = state.registry.list_active();
    let total = roster.len();
    info!(peer_id = %peer.id, name = %peer.name, total, "hub: peer left");

    let from = peer.id.to_string();
    broadcast(state, &event_frame(&ServerEvent::UserLeft { peer_id: peer.id, total }, &from), None).await;
    broadcast(state, &event_frame(&ServerEvent::Roster { peers: roster }, &from), None).await;
}

// =============================================================================
// DRAWING
// =============================================================================

/// Relay a finalized action to every other connection.
///
/// Durable kinds are appended to history; lasers are relayed only.
///
/// # Errors
///
/// `InvalidInput` when `action` is absent, `NotJoined` before join,
/// `Disconnected` after disconnect.
pub async fn send_draw(state: &AppState, conn: &Connection, action: Option<DrawAction>) -> Result<Outcome, HubError> {
    let peer = require_peer(state, conn)?;
    let Some(mut action) = action else {
        return Err(HubError::InvalidInput("action required".into()));
    };

    enrich(&mut action, &peer);
    action.is_preview = false;

    if action.kind.is_durable() {
        state.history.append(action.clone());
        debug!(peer_id = %peer.id, kind = action.kind.as_str(), tool = action.tool.as_str(), "hub: draw appended");
    } else {
        debug!(peer_id = %peer.id, laser_end = action.is_laser_end, "hub: laser relayed");
    }

    let frame = event_frame(&ServerEvent::DrawReceived(action), &peer.id.to_string());
    broadcast(state, &frame, Some(conn.id)).await;
    Ok(Outcome::Done)
}

/// Relay an in-progress preview to every other connection. Never touches history.
///
/// # Errors
///
/// Same as [`send_draw`].
pub async fn send_preview(
    state: &AppState,
    conn: &Connection,
    action: Option<DrawAction>,
) -> Result<Outcome, HubError> {
    let peer = require_peer(state, conn)?;
    let Some(mut action) = action else {
        return Err(HubError::InvalidInput("action required".into()));
    };

    enrich(&mut action, &peer);
    action.is_preview = true;
    debug!(peer_id = %peer.id, tool = action.tool.as_str(), "hub: preview relayed");

    let frame = event_frame(&ServerEvent::PreviewReceived(action), &peer.id.to_string());
    broadcast(state, &frame, Some(conn.id)).await;
    Ok(Outcome::Done)
}

/// Relay a pointer position to every other connection.
///
/// Unjoined senders and non-finite coordinates are ignored.
///
/// # Errors
///
/// `Disconnected` after disconnect.
pub async fn update_cursor(state: &AppState, conn: &Connection, x: f64, y: f64) -> Result<Outcome, HubError> {
    if conn.state == ConnectionState::Disconnected {
        return Err(HubError::Disconnected);
    }
    let Some(peer) = state.registry.get(conn.id) else {
        return Ok(Outcome::Silent);
    };
    if !x.is_finite() || !y.is_finite() {
        debug!(peer_id = %peer.id, "hub: non-finite cursor ignored");
        return Ok(Outcome::Silent);
    }

    let cursor = CursorMoved { peer_id: peer.id, x, y, name: peer.name, color: peer.color };
    let frame = event_frame(&ServerEvent::CursorMoved(cursor), &peer.id.to_string());
    broadcast(state, &frame, Some(conn.id)).await;
    Ok(Outcome::Silent)
}

/// Erase the shared history and tell every connection, sender included.
///
/// # Errors
///
/// `Disconnected` after disconnect.
pub async fn clear_all(state: &AppState, conn: &Connection) -> Result<Outcome, HubError> {
    if conn.state == ConnectionState::Disconnected {
        return Err(HubError::Disconnected);
    }
    let initiator_name = state
        .registry
        .get(conn.id)
        .map_or_else(|| ANONYMOUS_INITIATOR.to_owned(), |peer| peer.name);

    let removed = state.history.clear();
    info!(connection_id = %conn.id, initiator = %initiator_name, removed, "hub: board cleared");

    let frame = event_frame(&ServerEvent::Cleared { initiator_name }, &conn.id.to_string());
    broadcast(state, &frame, None).await;
    Ok(Outcome::Done)
}

// =============================================================================
// FAN-OUT
// =============================================================================

/// Send `frame` to every connection except `exclude`.
///
/// Senders are cloned out of the table first so the lock is released before
/// any delivery.
pub async fn broadcast(state: &AppState, frame: &Frame, exclude: Option<Uuid>) {
    let recipients: Vec<(Uuid, mpsc::Sender<Frame>)> = {
        let clients = state.clients.read().await;
        clients
            .iter()
            .filter(|(id, _)| exclude != Some(**id))
            .map(|(id, tx)| (*id, tx.clone()))
            .collect()
    };

    for (id, tx) in recipients {
        deliver(id, &tx, frame.clone());
    }
}

fn deliver(recipient: Uuid, tx: &mpsc::Sender<Frame>, frame: Frame) {
    match tx.try_send(frame) {
        Ok(()) => {}
        Err(TrySendError::Full(frame)) => {
            warn!(%recipient, syscall = %frame.syscall, "hub: recipient queue full, frame dropped");
        }
        Err(TrySendError::Closed(frame)) => {
            warn!(%recipient, syscall = %frame.syscall, "hub: recipient channel closed, frame dropped");
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn require_peer(state: &AppState, conn: &Connection) -> Result<Peer, HubError> {
    match conn.state {
        ConnectionState::Connecting => Err(HubError::NotJoined),
        ConnectionState::Disconnected => Err(HubError::Disconnected),
        ConnectionState::Active(_) => state.registry.get(conn.id).ok_or(HubError::NotJoined),
    }
}

/// Overwrite identity and timing with authoritative values and clamp style.
fn enrich(action: &mut DrawAction, peer: &Peer) {
    action.normalize();
    action.stamp(peer.id, &peer.name, &peer.color, frames::now_ms());
}

fn event_frame(event: &ServerEvent, from: &str) -> Frame {
    Frame::event(event).with_from(from)
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;

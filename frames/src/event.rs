//! Typed payloads layered over [`Frame`].
//!
//! Clients speak [`ClientRequest`]s; the server answers with unsolicited
//! [`ServerEvent`]s. Both are keyed by syscall name so the flat frame stays the
//! single transport type.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::action::DrawAction;
use crate::peer::Peer;
use crate::{Frame, Status, lenient};

/// Syscall names shared by every participant.
pub mod syscall {
    pub const SESSION_CONNECTED: &str = "session:connected";
    pub const SESSION_JOIN: &str = "session:join";
    pub const SESSION_JOINED: &str = "session:joined";
    pub const SESSION_ROSTER: &str = "session:roster";
    pub const SESSION_LEFT: &str = "session:left";
    pub const DRAW_SEND: &str = "draw:send";
    pub const DRAW_PREVIEW: &str = "draw:preview";
    pub const DRAW_RECEIVED: &str = "draw:received";
    pub const DRAW_PREVIEWED: &str = "draw:previewed";
    pub const CURSOR_UPDATE: &str = "cursor:update";
    pub const CURSOR_MOVED: &str = "cursor:moved";
    pub const BOARD_CLEAR: &str = "board:clear";
    pub const BOARD_CLEARED: &str = "board:cleared";
    pub const HISTORY_SNAPSHOT: &str = "history:snapshot";
    pub const GATEWAY_ERROR: &str = "gateway:error";
}

/// Error returned when a frame's payload does not match its syscall's schema.
#[derive(Debug, thiserror::Error)]
#[error("invalid {syscall} payload: {source}")]
pub struct EventError {
    pub syscall: String,
    #[source]
    pub source: serde_json::Error,
}

// =============================================================================
// CLIENT REQUESTS
// =============================================================================

/// Operations a peer asks the hub to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    Join { name: String },
    SendDraw(DrawAction),
    SendPreview(DrawAction),
    UpdateCursor { x: f64, y: f64 },
    ClearAll,
}

impl ClientRequest {
    #[must_use]
    pub fn syscall(&self) -> &'static str {
        match self {
            Self::Join { .. } => syscall::SESSION_JOIN,
            Self::SendDraw(_) => syscall::DRAW_SEND,
            Self::SendPreview(_) => syscall::DRAW_PREVIEW,
            Self::UpdateCursor { .. } => syscall::CURSOR_UPDATE,
            Self::ClearAll => syscall::BOARD_CLEAR,
        }
    }

    /// Wrap the request in a fresh request frame.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let data = match self {
            Self::Join { name } => serde_json::json!({ "name": name }),
            Self::SendDraw(action) | Self::SendPreview(action) => serde_json::json!({ "action": action }),
            Self::UpdateCursor { x, y } => serde_json::json!({ "x": x, "y": y }),
            Self::ClearAll => serde_json::json!({}),
        };
        Frame::request(self.syscall(), data)
    }
}

// =============================================================================
// SERVER EVENTS
// =============================================================================

/// A remote peer's pointer position, already enriched with identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorMoved {
    pub peer_id: Uuid,
    pub x: f64,
    pub y: f64,
    pub name: String,
    pub color: String,
}

/// Notifications the hub fans out to connections.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Connected { peer_id: Uuid },
    UserJoined { peer: Peer, total: usize },
    Roster { peers: Vec<Peer> },
    UserLeft { peer_id: Uuid, total: usize },
    DrawReceived(DrawAction),
    PreviewReceived(DrawAction),
    CursorMoved(CursorMoved),
    Cleared { initiator_name: String },
    HistorySnapshot { actions: Vec<DrawAction> },
}

#[derive(Serialize, Deserialize)]
struct ConnectedPayload {
    peer_id: Uuid,
}

#[derive(Serialize, Deserialize)]
struct JoinedPayload {
    peer: Peer,
    #[serde(deserialize_with = "lenient::int")]
    total: usize,
}

#[derive(Serialize, Deserialize)]
struct RosterPayload {
    peers: Vec<Peer>,
}

#[derive(Serialize, Deserialize)]
struct LeftPayload {
    peer_id: Uuid,
    #[serde(deserialize_with = "lenient::int")]
    total: usize,
}

#[derive(Serialize, Deserialize)]
struct ActionPayload {
    action: DrawAction,
}

#[derive(Serialize, Deserialize)]
struct ClearedPayload {
    initiator_name: String,
}

#[derive(Serialize, Deserialize)]
struct HistoryPayload {
    actions: Vec<DrawAction>,
}

impl ServerEvent {
    #[must_use]
    pub fn syscall(&self) -> &'static str {
        match self {
            Self::Connected { .. } => syscall::SESSION_CONNECTED,
            Self::UserJoined { .. } => syscall::SESSION_JOINED,
            Self::Roster { .. } => syscall::SESSION_ROSTER,
            Self::UserLeft { .. } => syscall::SESSION_LEFT,
            Self::DrawReceived(_) => syscall::DRAW_RECEIVED,
            Self::PreviewReceived(_) => syscall::DRAW_PREVIEWED,
            Self::CursorMoved(_) => syscall::CURSOR_MOVED,
            Self::Cleared { .. } => syscall::BOARD_CLEARED,
            Self::HistorySnapshot { .. } => syscall::HISTORY_SNAPSHOT,
        }
    }

    /// Payload as a JSON object.
    #[must_use]
    pub fn payload(&self) -> Value {
        let encoded = match self {
            Self::Connected { peer_id } => serde_json::to_value(ConnectedPayload { peer_id: *peer_id }),
            Self::UserJoined { peer, total } => {
                serde_json::to_value(JoinedPayload { peer: peer.clone(), total: *total })
            }
            Self::Roster { peers } => serde_json::to_value(RosterPayload { peers: peers.clone() }),
            Self::UserLeft { peer_id, total } => serde_json::to_value(LeftPayload { peer_id: *peer_id, total: *total }),
            Self::DrawReceived(action) | Self::PreviewReceived(action) => {
                serde_json::to_value(ActionPayload { action: action.clone() })
            }
            Self::CursorMoved(cursor) => serde_json::to_value(cursor),
            Self::Cleared { initiator_name } => {
                serde_json::to_value(ClearedPayload { initiator_name: initiator_name.clone() })
            }
            Self::HistorySnapshot { actions } => serde_json::to_value(HistoryPayload { actions: actions.clone() }),
        };
        encoded.unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
    }

    /// Wrap the event in an unsolicited request frame.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        Frame::request(self.syscall(), self.payload())
    }

    /// Decode a server event from a frame.
    ///
    /// Returns `Ok(None)` for frames that are not events: replies to the
    /// caller's own requests, gateway errors, and unknown syscalls.
    pub fn from_frame(frame: &Frame) -> Result<Option<Self>, EventError> {
        if frame.status != Status::Request {
            return Ok(None);
        }
        let data = &frame.data;
        let event = match frame.syscall.as_str() {
            syscall::SESSION_CONNECTED => {
                let p: ConnectedPayload = parse(frame, data)?;
                Self::Connected { peer_id: p.peer_id }
            }
            syscall::SESSION_JOINED => {
                let p: JoinedPayload = parse(frame, data)?;
                Self::UserJoined { peer: p.peer, total: p.total }
            }
            syscall::SESSION_ROSTER => {
                let p: RosterPayload = parse(frame, data)?;
                Self::Roster { peers: p.peers }
            }
            syscall::SESSION_LEFT => {
                let p: LeftPayload = parse(frame, data)?;
                Self::UserLeft { peer_id: p.peer_id, total: p.total }
            }
            syscall::DRAW_RECEIVED => {
                let p: ActionPayload = parse(frame, data)?;
                Self::DrawReceived(p.action)
            }
            syscall::DRAW_PREVIEWED => {
                let p: ActionPayload = parse(frame, data)?;
                Self::PreviewReceived(p.action)
            }
            syscall::CURSOR_MOVED => Self::CursorMoved(parse(frame, data)?),
            syscall::BOARD_CLEARED => {
                let p: ClearedPayload = parse(frame, data)?;
                Self::Cleared { initiator_name: p.initiator_name }
            }
            syscall::HISTORY_SNAPSHOT => {
                let p: HistoryPayload = parse(frame, data)?;
                Self::HistorySnapshot { actions: p.actions }
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

fn parse<T: DeserializeOwned>(frame: &Frame, data: &Value) -> Result<T, EventError> {
    T::deserialize(data).map_err(|source| EventError { syscall: frame.syscall.clone(), source })
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;

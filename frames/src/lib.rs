//! Wire model for the shared whiteboard.
//!
//! Every websocket message is a [`Frame`]: an envelope with a syscall name, a
//! lifecycle [`Status`] and a free-form JSON payload. The server, the canvas
//! compositor and the CLI all speak it. Payloads stay loosely typed here; the
//! typed view lives in [`event`].
//!
//! | Module | Role |
//! |--------|------|
//! | [`codec`] | Protobuf encoding of frames for binary websocket messages |
//! | [`action`] | `DrawAction` and the closed `Tool` / `ActionKind` vocabularies |
//! | [`peer`] | Peer identity as shown in rosters |
//! | [`event`] | Typed client requests and server events, keyed by syscall |
//! | [`history`] | Bounded FIFO log of finalized actions |

pub mod action;
pub mod codec;
pub mod event;
pub mod history;
pub mod peer;

mod lenient;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub use action::{ActionKind, DrawAction, Tool};
pub use codec::{CodecError, decode_frame, encode_frame};
pub use event::{ClientRequest, EventError, ServerEvent};
pub use history::HistoryLog;
pub use peer::Peer;

/// Where a frame sits in an exchange. Requests (and unsolicited events) are
/// answered by exactly one `Done` or `Error`; there is no streaming.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Request,
    Done,
    Error,
}

impl Status {
    /// Terminal statuses close the exchange opened by a request.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Request)
    }
}

/// One websocket message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// UUID string, fresh per frame.
    pub id: String,
    /// For replies, the id of the request being answered.
    pub parent_id: Option<String>,
    /// Creation time, milliseconds since the Unix epoch.
    pub ts: i64,
    /// Sending peer id, or `None` for server replies.
    pub from: Option<String>,
    /// `prefix:op`, e.g. `draw:send`.
    pub syscall: String,
    pub status: Status,
    pub data: Value,
}

impl Frame {
    /// A new request (or event) frame stamped with a fresh id and the current time.
    pub fn request(syscall: impl Into<String>, data: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id: None,
            ts: now_ms(),
            from: None,
            syscall: syscall.into(),
            status: Status::Request,
            data,
        }
    }

    /// The `message` field of an error reply or gateway error.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.data.get("message").and_then(Value::as_str)
    }
}

/// Wall clock in milliseconds since the Unix epoch. Zero if the clock is
/// before the epoch.
#[cfg(not(target_arch = "wasm32"))]
#[must_use]
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| i64::try_from(elapsed.as_millis()).ok())
        .unwrap_or(0)
}

/// Wall clock from the browser, milliseconds since the Unix epoch.
#[cfg(target_arch = "wasm32")]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn now_ms() -> i64 {
    js_sys::Date::now() as i64
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;

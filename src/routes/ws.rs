//! WebSocket handler, bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, registers a hub connection and enters a `select!` loop:
//! - Incoming client frames → decode + dispatch by syscall prefix
//! - Hub fan-out frames from peers → forward to client
//!
//! Handlers translate frame payloads into hub calls and return the hub's
//! `Outcome`. The dispatch layer turns that into the sender's reply; the hub
//! itself owns fan-out to every other connection.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with the connection's `peer_id`
//! 2. Client sends frames → dispatch → hub op → reply (or nothing)
//! 3. Close or transport error → `hub::disconnect` → `session:left` to peers

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use frames::event::syscall;
use frames::{DrawAction, ServerEvent};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{Data, Frame, Status};
use crate::services::hub::{self, Connection, HubError, Outcome};
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    // Per-connection channel for receiving fan-out frames from peers.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.config.client_channel_capacity);
    let mut conn = hub::connect(&state, client_tx).await;
    let connection_id = conn.id();

    let welcome = Frame::event(&ServerEvent::Connected { peer_id: connection_id });
    if send_frame(&mut socket, &welcome).await.is_err() {
        hub::disconnect(&state, &mut conn).await;
        return;
    }

    info!(%connection_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                let replies = match msg {
                    Message::Binary(bytes) => process_inbound_bytes(&state, &mut conn, &bytes).await,
                    Message::Text(text) => process_inbound_text(&state, &mut conn, text.as_str()).await,
                    Message::Close(_) => break,
                    _ => continue,
                };
                if send_frames(&mut socket, &replies).await.is_err() {
                    break;
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    hub::disconnect(&state, &mut conn).await;
    info!(%connection_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode one protobuf frame and return frames for the sender.
async fn process_inbound_bytes(state: &AppState, conn: &mut Connection, bytes: &[u8]) -> Vec<Frame> {
    let wire = match frames::decode_frame(bytes) {
        Ok(wire) => wire,
        Err(e) => return vec![gateway_error(conn.id(), &format!("invalid frame: {e}"))],
    };
    match Frame::try_from(wire) {
        Ok(req) => dispatch(state, conn, req).await,
        Err(e) => vec![gateway_error(conn.id(), &format!("invalid frame: {e}"))],
    }
}

/// Decode one JSON frame and return frames for the sender.
async fn process_inbound_text(state: &AppState, conn: &mut Connection, text: &str) -> Vec<Frame> {
    match serde_json::from_str::<Frame>(text) {
        Ok(req) => dispatch(state, conn, req).await,
        Err(e) => vec![gateway_error(conn.id(), &format!("invalid json: {e}"))],
    }
}

async fn dispatch(state: &AppState, conn: &mut Connection, mut req: Frame) -> Vec<Frame> {
    if req.status != Status::Request {
        debug!(connection_id = %conn.id(), id = %req.id, status = ?req.status, "ws: ignoring non-request frame");
        return vec![];
    }

    // Stamp the connection id as `from`; clients cannot speak for others.
    req.from = Some(conn.id().to_string());

    let prefix = req.prefix();
    if prefix == "cursor" {
        debug!(connection_id = %conn.id(), syscall = %req.syscall, "ws: recv frame");
    } else {
        info!(connection_id = %conn.id(), id = %req.id, syscall = %req.syscall, "ws: recv frame");
    }

    let result = match prefix {
        "session" => handle_session(state, conn, &req).await,
        "draw" => handle_draw(state, conn, &req).await,
        "cursor" => handle_cursor(state, conn, &req).await,
        "board" => handle_board(state, conn, &req).await,
        _ => Err(req.error(format!("unknown prefix: {prefix}"))),
    };

    match result {
        Ok(Outcome::Silent) => vec![],
        Ok(Outcome::Done) => vec![req.done()],
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn handle_session(state: &AppState, conn: &mut Connection, req: &Frame) -> Result<Outcome, Frame> {
    match req.op() {
        "join" => {
            let name = req.data.get("name").and_then(Value::as_str).unwrap_or("");
            hub::join(state, conn, name).await.map_err(|e| req.error_from(&e))
        }
        op => Err(req.error(format!("unknown session op: {op}"))),
    }
}

async fn handle_draw(state: &AppState, conn: &Connection, req: &Frame) -> Result<Outcome, Frame> {
    let op = req.op();
    if op != "send" && op != "preview" {
        return Err(req.error(format!("unknown draw op: {op}")));
    }

    let action = parse_action(&req.data).map_err(|e| req.error_from(&e))?;
    let result = if op == "send" {
        hub::send_draw(state, conn, action).await
    } else {
        hub::send_preview(state, conn, action).await
    };
    result.map_err(|e| req.error_from(&e))
}

async fn handle_cursor(state: &AppState, conn: &Connection, req: &Frame) -> Result<Outcome, Frame> {
    match req.op() {
        "update" => {
            let x = req.data.get("x").and_then(Value::as_f64);
            let y = req.data.get("y").and_then(Value::as_f64);
            let (Some(x), Some(y)) = (x, y) else {
                // Cursor traffic never gets a reply, malformed or not.
                debug!(connection_id = %conn.id(), "ws: cursor without coordinates ignored");
                return Ok(Outcome::Silent);
            };
            hub::update_cursor(state, conn, x, y).await.map_err(|e| req.error_from(&e))
        }
        op => Err(req.error(format!("unknown cursor op: {op}"))),
    }
}

async fn handle_board(state: &AppState, conn: &Connection, req: &Frame) -> Result<Outcome, Frame> {
    match req.op() {
        "clear" => hub::clear_all(state, conn).await.map_err(|e| req.error_from(&e)),
        op => Err(req.error(format!("unknown board op: {op}"))),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Absent or null `action` is `None`; a present but malformed one is invalid.
fn parse_action(data: &Data) -> Result<Option<DrawAction>, HubError> {
    match data.get("action") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => DrawAction::deserialize(value)
            .map(Some)
            .map_err(|e| HubError::InvalidInput(format!("malformed action: {e}"))),
    }
}

fn gateway_error(connection_id: Uuid, message: &str) -> Frame {
    warn!(%connection_id, error = message, "ws: invalid inbound frame");
    Frame::request(syscall::GATEWAY_ERROR, Data::new()).with_data("message", message)
}

async fn send_frames(socket: &mut WebSocket, replies: &[Frame]) -> Result<(), ()> {
    for frame in replies {
        send_frame(socket, frame).await?;
    }
    Ok(())
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    if frame.status == Status::Error {
        let code = frame.data.get("code").and_then(|v| v.as_str()).unwrap_or("-");
        let message = frame.data.get("message").and_then(|v| v.as_str()).unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else if !frame.syscall.starts_with("cursor:") {
        debug!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }

    let bytes = frames::encode_frame(&frames::Frame::from(frame));
    socket.send(Message::Binary(bytes.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

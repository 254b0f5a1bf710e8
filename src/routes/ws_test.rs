use super::*;
use crate::state::test_helpers::{self, connect, join};
use frames::{ClientRequest, Tool};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;

fn request_bytes(syscall: &str, data: Data) -> (Uuid, Vec<u8>) {
    let req = Frame::request(syscall, data);
    (req.id, frames::encode_frame(&frames::Frame::from(&req)))
}

fn data(value: Value) -> Data {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => Data::new(),
    }
}

fn code(frame: &Frame) -> Option<&str> {
    frame.data.get("code").and_then(Value::as_str)
}

fn drain(rx: &mut mpsc::Receiver<Frame>) -> Vec<Frame> {
    let mut out = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        out.push(frame);
    }
    out
}

// =============================================================================
// DISPATCH
// =============================================================================

#[tokio::test]
async fn join_replies_done_with_peer_and_roster() {
    let state = test_helpers::test_app_state();
    let (mut conn, _rx) = connect(&state).await;
    let (req_id, bytes) = request_bytes("session:join", data(json!({"name": "Alice"})));

    let replies = process_inbound_bytes(&state, &mut conn, &bytes).await;

    assert_eq!(replies.len(), 1);
    let reply = &replies[0];
    assert_eq!(reply.status, Status::Done);
    assert_eq!(reply.parent_id, Some(req_id));
    assert_eq!(reply.syscall, "session:join");
    assert_eq!(reply.data["peer"]["name"], "Alice");
    assert_eq!(reply.data["peer"]["id"], json!(conn.id()));
    assert_eq!(reply.data["roster"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn join_without_name_is_invalid_input() {
    let state = test_helpers::test_app_state();
    let (mut conn, _rx) = connect(&state).await;
    let (_, bytes) = request_bytes("session:join", Data::new());

    let replies = process_inbound_bytes(&state, &mut conn, &bytes).await;

    assert_eq!(replies[0].status, Status::Error);
    assert_eq!(code(&replies[0]), Some("E_INVALID_INPUT"));
    assert_eq!(state.registry.count(), 0);
}

#[tokio::test]
async fn malformed_bytes_produce_gateway_error() {
    let state = test_helpers::test_app_state();
    let (mut conn, _rx) = connect(&state).await;

    let replies = process_inbound_bytes(&state, &mut conn, &[0xff, 0x00, 0x01]).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].syscall, "gateway:error");
    assert!(replies[0].data["message"].as_str().is_some_and(|m| m.starts_with("invalid frame")));
}

#[tokio::test]
async fn malformed_json_produces_gateway_error() {
    let state = test_helpers::test_app_state();
    let (mut conn, _rx) = connect(&state).await;

    let replies = process_inbound_text(&state, &mut conn, "{not json").await;

    assert_eq!(replies[0].syscall, "gateway:error");
}

#[tokio::test]
async fn json_text_frames_are_dispatched() {
    let state = test_helpers::test_app_state();
    let (mut conn, _rx) = connect(&state).await;
    let req = Frame::request("session:join", Data::new()).with_data("name", "Alice");
    let text = serde_json::to_string(&req).expect("serialize");

    let replies = process_inbound_text(&state, &mut conn, &text).await;

    assert_eq!(replies[0].status, Status::Done);
    assert_eq!(state.registry.count(), 1);
}

#[tokio::test]
async fn unknown_prefix_and_op_are_errors() {
    let state = test_helpers::test_app_state();
    let (mut conn, _rx) = join(&state, "Alice").await;

    for syscall in ["chat:send", "draw:erase", "session:kick", "board:rename", "cursor:hide"] {
        let (_, bytes) = request_bytes(syscall, Data::new());
        let replies = process_inbound_bytes(&state, &mut conn, &bytes).await;
        assert_eq!(replies.len(), 1, "{syscall}");
        assert_eq!(replies[0].status, Status::Error, "{syscall}");
    }
}

#[tokio::test]
async fn non_request_frames_are_ignored() {
    let state = test_helpers::test_app_state();
    let (mut conn, _rx) = connect(&state).await;
    let req = Frame::request("session:join", Data::new()).with_data("name", "Alice");
    let done = req.done();

    let replies = process_inbound_bytes(&state, &mut conn, &frames::encode_frame(&frames::Frame::from(&done))).await;

    assert!(replies.is_empty());
    assert_eq!(state.registry.count(), 0);
}

#[tokio::test]
async fn draw_without_action_is_invalid_input() {
    let state = test_helpers::test_app_state();
    let (mut conn, _rx) = join(&state, "Alice").await;

    for payload in [json!({}), json!({"action": null}), json!({"action": "pen"})] {
        let (_, bytes) = request_bytes("draw:send", data(payload));
        let replies = process_inbound_bytes(&state, &mut conn, &bytes).await;
        assert_eq!(code(&replies[0]), Some("E_INVALID_INPUT"));
    }
    assert_eq!(state.history.len(), 0);
}

#[tokio::test]
async fn draw_before_join_is_not_joined() {
    let state = test_helpers::test_app_state();
    let (mut conn, _rx) = connect(&state).await;
    let action = DrawAction::segment(Tool::Pen, (0.0, 0.0), (1.0, 1.0));
    let (_, bytes) = request_bytes("draw:send", data(json!({"action": action})));

    let replies = process_inbound_bytes(&state, &mut conn, &bytes).await;

    assert_eq!(code(&replies[0]), Some("E_NOT_JOINED"));
}

#[tokio::test]
async fn draw_relays_with_authoritative_from() {
    let state = test_helpers::test_app_state();
    let (mut alice, _rx_a) = join(&state, "Alice").await;
    let (_bob, mut rx_b) = join(&state, "Bob").await;
    let action = DrawAction::shape(Tool::Circle, (0.0, 0.0), (10.0, 10.0));
    let mut req = Frame::request("draw:send", data(json!({"action": action})));
    req.from = Some("mallory".to_owned());
    let bytes = frames::encode_frame(&frames::Frame::from(&req));

    let replies = process_inbound_bytes(&state, &mut alice, &bytes).await;

    assert_eq!(replies[0].status, Status::Done);
    assert!(replies[0].data.is_empty());
    let relayed = drain(&mut rx_b);
    assert_eq!(relayed.len(), 1);
    assert_eq!(relayed[0].syscall, "draw:received");
    assert_eq!(relayed[0].from, Some(alice.id().to_string()));
    assert_eq!(relayed[0].data["action"]["tool"], "circle");
    assert_eq!(relayed[0].data["action"]["author_name"], "Alice");
}

#[tokio::test]
async fn draw_with_wild_style_is_clamped_not_rejected() {
    let state = test_helpers::test_app_state();
    let (mut alice, _rx_a) = join(&state, "Alice").await;
    let (_bob, mut rx_b) = join(&state, "Bob").await;
    let payload = json!({"action": {"tool": null, "kind": null, "line_width": -5, "font_size": -1}});
    let (_, bytes) = request_bytes("draw:send", data(payload));

    let replies = process_inbound_bytes(&state, &mut alice, &bytes).await;

    assert_eq!(replies[0].status, Status::Done);
    let relayed = drain(&mut rx_b);
    assert_eq!(relayed.len(), 1);
    let action = &relayed[0].data["action"];
    assert_eq!(action["tool"], "pen");
    assert_eq!(action["kind"], "draw");
    assert_eq!(action["line_width"], json!(1));
    assert_eq!(action["font_size"], json!(1));
    assert_eq!(state.history.len(), 1);

    let (_, bytes) = request_bytes("draw:send", data(json!({"action": {"line_width": 5_000_000_000_u64}})));
    assert_eq!(process_inbound_bytes(&state, &mut alice, &bytes).await[0].status, Status::Done);
    assert_eq!(drain(&mut rx_b)[0].data["action"]["line_width"], json!(30));
}

#[tokio::test]
async fn cursor_update_gets_no_reply() {
    let state = test_helpers::test_app_state();
    let (mut alice, _rx_a) = join(&state, "Alice").await;
    let (_bob, mut rx_b) = join(&state, "Bob").await;

    let (_, bytes) = request_bytes("cursor:update", data(json!({"x": 100.0, "y": 200.0})));
    assert!(process_inbound_bytes(&state, &mut alice, &bytes).await.is_empty());

    let (_, bytes) = request_bytes("cursor:update", data(json!({"x": 1.0})));
    assert!(process_inbound_bytes(&state, &mut alice, &bytes).await.is_empty());

    let relayed = drain(&mut rx_b);
    assert_eq!(relayed.len(), 1);
    assert_eq!(relayed[0].data["name"], "Alice");
}

#[tokio::test]
async fn board_clear_replies_done() {
    let state = test_helpers::test_app_state();
    let (mut alice, mut rx_a) = join(&state, "Alice").await;
    let (_, bytes) = request_bytes("board:clear", Data::new());

    let replies = process_inbound_bytes(&state, &mut alice, &bytes).await;

    assert_eq!(replies[0].status, Status::Done);
    let notified = drain(&mut rx_a);
    assert_eq!(notified[0].syscall, "board:cleared");
    assert_eq!(notified[0].data["initiator_name"], "Alice");
}

#[test]
fn parse_action_distinguishes_absent_from_malformed() {
    assert!(matches!(parse_action(&Data::new()), Ok(None)));
    assert!(matches!(parse_action(&data(json!({"action": {}}))), Ok(Some(_))));
    assert!(matches!(parse_action(&data(json!({"action": 3}))), Err(HubError::InvalidInput(_))));
}

// =============================================================================
// END TO END
// =============================================================================

type Client = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn spawn_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = crate::routes::app(test_helpers::test_app_state());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

async fn open_client(addr: SocketAddr) -> (Client, Uuid) {
    let (mut stream, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/api/ws"))
        .await
        .expect("connect");
    let welcome = next_matching(&mut stream, |f| f.syscall == "session:connected").await;
    let peer_id = welcome.data["peer_id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("peer_id");
    (stream, peer_id)
}

async fn send(stream: &mut Client, request: &ClientRequest) -> String {
    let frame = request.to_frame();
    let id = frame.id.clone();
    stream
        .send(WsMessage::Binary(frames::encode_frame(&frame).into()))
        .await
        .expect("send");
    id
}

async fn next_matching(stream: &mut Client, pred: impl Fn(&frames::Frame) -> bool) -> frames::Frame {
    timeout(Duration::from_secs(2), async {
        loop {
            let msg = stream.next().await.expect("stream open").expect("ws message");
            if let WsMessage::Binary(bytes) = msg {
                let frame = frames::decode_frame(&bytes).expect("decode");
                if pred(&frame) {
                    return frame;
                }
            }
        }
    })
    .await
    .expect("timed out waiting for frame")
}

async fn join_as(stream: &mut Client, name: &str) {
    let id = send(stream, &ClientRequest::Join { name: name.to_owned() }).await;
    let reply = next_matching(stream, |f| f.parent_id.as_deref() == Some(id.as_str())).await;
    assert_eq!(reply.status, frames::Status::Done);
}

#[tokio::test]
async fn two_peers_exchange_cursor_draw_and_leave_over_sockets() {
    let addr = spawn_server().await;
    let (mut alice, alice_id) = open_client(addr).await;
    let (mut bob, _bob_id) = open_client(addr).await;

    join_as(&mut alice, "Alice").await;
    join_as(&mut bob, "Bob").await;

    let roster = next_matching(&mut alice, |f| {
        f.syscall == "session:roster" && f.data["peers"].as_array().map(Vec::len) == Some(2)
    })
    .await;
    assert_eq!(roster.data["peers"][1]["name"], "Bob");

    send(&mut alice, &ClientRequest::UpdateCursor { x: 100.0, y: 200.0 }).await;
    let cursor = next_matching(&mut bob, |f| f.syscall == "cursor:moved").await;
    let event = ServerEvent::from_frame(&cursor).expect("payload").expect("event");
    let ServerEvent::CursorMoved(moved) = event else {
        panic!("expected cursor:moved");
    };
    assert_eq!(moved.peer_id, alice_id);
    assert!((moved.x - 100.0).abs() < f64::EPSILON);
    assert!((moved.y - 200.0).abs() < f64::EPSILON);
    assert_eq!(moved.name, "Alice");

    let stroke = DrawAction::segment(Tool::Pen, (1.0, 1.0), (2.0, 2.0)).with_line_width(4);
    send(&mut alice, &ClientRequest::SendDraw(stroke)).await;
    let drawn = next_matching(&mut bob, |f| f.syscall == "draw:received").await;
    let Some(ServerEvent::DrawReceived(action)) = ServerEvent::from_frame(&drawn).expect("payload") else {
        panic!("expected draw:received");
    };
    assert_eq!(action.author_id, Some(alice_id));
    assert_eq!(action.line_width, 4);

    alice.close(None).await.expect("close");
    let left = next_matching(&mut bob, |f| f.syscall == "session:left").await;
    assert_eq!(left.data["peer_id"], json!(alice_id.to_string()));
    assert_eq!(left.data["total"], json!(1.0));
}

#[tokio::test]
async fn healthz_route_is_mounted() {
    let addr = spawn_server().await;
    let mut stream = tokio::net::TcpStream::connect(addr).await.expect("connect");
    stream
        .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .expect("write");
    let mut response = String::new();
    stream.read_to_string(&mut response).await.expect("read");
    assert!(response.starts_with("HTTP/1.1 200"));
}

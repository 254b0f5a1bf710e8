use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use frames::action::{DEFAULT_COLOR, DEFAULT_FONT_SIZE, DEFAULT_LINE_WIDTH};
use frames::{ActionKind, ClientRequest, DrawAction, Frame, Peer, Status, Tool};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid websocket URL: {0}")]
    InvalidUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket failed: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("frame decode failed: {0}")]
    Decode(#[from] frames::CodecError),
    #[error("timed out waiting for websocket frame")]
    Timeout,
    #[error("server returned error for {syscall}: {message}")]
    ServerError { syscall: String, message: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CliError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Ws(Box::new(error))
    }
}

#[derive(Parser, Debug)]
#[command(name = "whiteboard-cli", about = "Whiteboard session websocket CLI")]
struct Cli {
    #[arg(long, env = "WHITEBOARD_WS_URL", default_value = "ws://127.0.0.1:3000/api/ws")]
    url: String,

    #[arg(long, env = "WHITEBOARD_NAME", default_value = "cli")]
    name: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the server's health endpoint.
    Ping,
    /// Join and print every server event as a JSON line.
    Watch {
        #[arg(long, help = "Stop after this many events")]
        limit: Option<usize>,
    },
    /// Join and move this peer's cursor once.
    Cursor { x: f64, y: f64 },
    /// Join and commit one drawing action.
    Draw(DrawArgs),
    /// Join and clear the board for everyone.
    Clear,
}

#[derive(Args, Debug, Clone)]
struct DrawArgs {
    #[arg(long, default_value = "pen")]
    tool: String,

    #[arg(long, help = "Start point as x,y (previous point for pen and eraser)")]
    from: Point,

    #[arg(long, help = "End point as x,y (current point for pen and eraser)")]
    to: Point,

    #[arg(long, default_value = DEFAULT_COLOR)]
    color: String,

    #[arg(long, default_value_t = DEFAULT_LINE_WIDTH)]
    width: u32,

    #[arg(long, default_value_t = false)]
    filled: bool,

    #[arg(long, help = "Text to place at --from (text tool)")]
    text: Option<String>,

    #[arg(long, default_value_t = DEFAULT_FONT_SIZE)]
    font_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f64,
    y: f64,
}

impl FromStr for Point {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (x, y) = raw.split_once(',').ok_or_else(|| format!("expected x,y but got `{raw}`"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|error| format!("invalid coordinate `{part}`: {error}"))
        };
        Ok(Self { x: parse(x)?, y: parse(y)? })
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ping => run_ping(&cli.url).await,
        Command::Watch { limit } => run_watch(&cli.url, &cli.name, limit).await,
        Command::Cursor { x, y } => run_cursor(&cli.url, &cli.name, x, y).await,
        Command::Draw(args) => run_draw(&cli.url, &cli.name, &args).await,
        Command::Clear => run_clear(&cli.url, &cli.name).await,
    }
}

async fn run_ping(ws_url: &str) -> Result<(), CliError> {
    let client = reqwest::Client::new();
    let response = client.get(health_url(ws_url)?).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError {
            syscall: format!("HTTP {}", status.as_u16()),
            message: "health check failed".to_owned(),
        });
    }
    println!("ok");
    Ok(())
}

async fn run_watch(ws_url: &str, name: &str, limit: Option<usize>) -> Result<(), CliError> {
    let (mut stream, peer) = open_session(ws_url, name).await?;
    eprintln!("watching as {} ({})", peer.name, peer.id);

    let mut seen = 0_usize;
    loop {
        let Some(message) = stream.next().await else {
            return Ok(());
        };
        let bytes = match message? {
            Message::Binary(bytes) => bytes,
            Message::Close(_) => return Ok(()),
            _ => continue,
        };
        let frame = frames::decode_frame(&bytes)?;
        if frame.status != Status::Request {
            continue;
        }
        println!("{}", event_line(&frame)?);

        seen = seen.saturating_add(1);
        if limit.is_some_and(|limit| seen >= limit) {
            stream.close(None).await?;
            return Ok(());
        }
    }
}

async fn run_cursor(ws_url: &str, name: &str, x: f64, y: f64) -> Result<(), CliError> {
    let (mut stream, _) = open_session(ws_url, name).await?;
    send_request(&mut stream, &ClientRequest::UpdateCursor { x, y }).await?;
    stream.close(None).await?;
    eprintln!("cursor moved to ({x}, {y})");
    Ok(())
}

async fn run_draw(ws_url: &str, name: &str, args: &DrawArgs) -> Result<(), CliError> {
    let action = build_action(args)?;
    let (mut stream, _) = open_session(ws_url, name).await?;
    let request = ClientRequest::SendDraw(action);
    let id = send_request(&mut stream, &request).await?;
    wait_for_terminal_response(&mut stream, &id, request.syscall()).await?;
    stream.close(None).await?;
    eprintln!("draw complete: tool={}", args.tool);
    Ok(())
}

async fn run_clear(ws_url: &str, name: &str) -> Result<(), CliError> {
    let (mut stream, _) = open_session(ws_url, name).await?;
    let id = send_request(&mut stream, &ClientRequest::ClearAll).await?;
    wait_for_terminal_response(&mut stream, &id, ClientRequest::ClearAll.syscall()).await?;
    stream.close(None).await?;
    eprintln!("board cleared");
    Ok(())
}

/// Connect, wait for the welcome frame, and join under `name`.
async fn open_session(ws_url: &str, name: &str) -> Result<(WsStream, Peer), CliError> {
    let (mut stream, _) = connect_async(ws_url).await?;
    wait_for_session_connected(&mut stream).await?;

    let join = ClientRequest::Join { name: name.to_owned() };
    let join_id = send_request(&mut stream, &join).await?;
    let reply = wait_for_terminal_response(&mut stream, &join_id, join.syscall()).await?;
    let peer = serde_json::from_value::<Peer>(reply.data.get("peer").cloned().unwrap_or(Value::Null))?;
    Ok((stream, peer))
}

async fn send_request(stream: &mut WsStream, request: &ClientRequest) -> Result<String, CliError> {
    let frame = request.to_frame();
    let id = frame.id.clone();
    stream.send(Message::Binary(frames::encode_frame(&frame).into())).await?;
    Ok(id)
}

async fn wait_for_session_connected(stream: &mut WsStream) -> Result<(), CliError> {
    loop {
        let frame = recv_next(stream, Duration::from_secs(5)).await?;
        if frame.syscall == "session:connected" {
            return Ok(());
        }
    }
}

async fn wait_for_terminal_response(stream: &mut WsStream, request_id: &str, syscall: &str) -> Result<Frame, CliError> {
    loop {
        let frame = recv_next(stream, Duration::from_secs(15)).await?;
        if frame.parent_id.as_deref() != Some(request_id) {
            continue;
        }
        if frame.syscall != syscall {
            continue;
        }
        if !frame.status.is_terminal() {
            continue;
        }
        if frame.status == Status::Error {
            return Err(CliError::ServerError {
                message: frame.error_message().unwrap_or("unknown websocket error").to_owned(),
                syscall: frame.syscall,
            });
        }
        return Ok(frame);
    }
}

async fn recv_next(stream: &mut WsStream, timeout: Duration) -> Result<Frame, CliError> {
    let fut = async {
        loop {
            let Some(message) = stream.next().await else {
                return Err(CliError::WsClosed);
            };
            match message? {
                Message::Binary(bytes) => {
                    return frames::decode_frame(&bytes).map_err(CliError::from);
                }
                Message::Close(_) => return Err(CliError::WsClosed),
                _ => {}
            }
        }
    };

    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| CliError::Timeout)?
}

/// Turn command-line draw arguments into one durable action.
fn build_action(args: &DrawArgs) -> Result<DrawAction, CliError> {
    let tool = Tool::parse(&args.tool);
    let (from, to) = ((args.from.x, args.from.y), (args.to.x, args.to.y));

    let action = if tool == Tool::Laser {
        return Err(CliError::Usage("laser pointers are not durable; use watch to see them".to_owned()));
    } else if tool == Tool::Text || args.text.is_some() {
        let Some(text) = args.text.clone().filter(|text| !text.is_empty()) else {
            return Err(CliError::Usage("the text tool needs --text".to_owned()));
        };
        DrawAction {
            kind: ActionKind::Text,
            tool: Tool::Text,
            x: from.0,
            y: from.1,
            text: Some(text),
            font_size: args.font_size,
            ..DrawAction::default()
        }
    } else if tool.is_freehand() {
        DrawAction::segment(tool, from, to)
    } else {
        DrawAction::shape(tool, from, to).with_filled(args.filled)
    };

    Ok(action.with_color(args.color.clone()).with_line_width(args.width))
}

/// `/healthz` on the same host as the websocket endpoint.
fn health_url(ws_url: &str) -> Result<String, CliError> {
    let (scheme, rest) = if let Some(rest) = ws_url.strip_prefix("ws://") {
        ("http", rest)
    } else if let Some(rest) = ws_url.strip_prefix("wss://") {
        ("https", rest)
    } else {
        return Err(CliError::InvalidUrl(ws_url.to_owned()));
    };
    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(CliError::InvalidUrl(ws_url.to_owned()));
    }
    Ok(format!("{scheme}://{host}/healthz"))
}

/// One compact JSON line per server event.
fn event_line(frame: &Frame) -> Result<String, CliError> {
    let line = serde_json::json!({
        "ts": frame.ts,
        "syscall": frame.syscall,
        "from": frame.from,
        "data": frame.data,
    });
    Ok(serde_json::to_string(&line)?)
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

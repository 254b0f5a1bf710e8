//! Engine: wires the wire protocol, the compositor, and the browser together.
//!
//! `EngineCore` holds everything that does not need a canvas element, so the
//! protocol handling can be tested natively. `Engine` adds a [`CanvasSurface`]
//! and [`start_render_loop`] drives it from `requestAnimationFrame`.
//!
//! The host owns the websocket. It feeds inbound binary messages to
//! [`Engine::on_message`] and sends whatever [`ClientRequest`] the input
//! helpers return, encoded with [`encode_request`].

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use frames::event::syscall;
use frames::{ClientRequest, DrawAction, EventError, Frame, Peer, ServerEvent, Status};
use serde::Deserialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::Closure;
use web_sys::{HtmlCanvasElement, console};

use crate::compositor::{Compositor, Surface};
use crate::overlay::OverlayConfig;
use crate::render::CanvasSurface;

/// Failures surfaced to the host.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Codec(#[from] frames::CodecError),
    #[error(transparent)]
    Event(#[from] EventError),
    #[error("{syscall} rejected: {message}")]
    Rejected { syscall: String, message: String },
    #[error("browser window unavailable")]
    NoWindow,
    #[error("canvas surface unavailable: {0}")]
    Surface(String),
}

/// Encode a request for the websocket.
#[must_use]
pub fn encode_request(request: &ClientRequest) -> Vec<u8> {
    frames::encode_frame(&request.to_frame())
}

#[derive(Deserialize)]
struct JoinReply {
    peer: Peer,
    #[serde(default)]
    roster: Vec<Peer>,
    #[serde(default)]
    history: Option<Vec<DrawAction>>,
}

/// Core engine state: all logic that doesn't depend on the canvas element.
#[derive(Default)]
pub struct EngineCore {
    pub compositor: Compositor,
}

impl EngineCore {
    #[must_use]
    pub fn new(config: OverlayConfig) -> Self {
        Self { compositor: Compositor::new(config) }
    }

    // --- Inbound ---

    /// Decode and apply one binary websocket message.
    ///
    /// # Errors
    ///
    /// Undecodable bytes, payloads that do not match their syscall, and
    /// error replies from the server.
    pub fn handle_bytes(&mut self, bytes: &[u8], now: i64) -> Result<(), EngineError> {
        let frame = frames::decode_frame(bytes)?;
        self.handle_frame(&frame, now)
    }

    /// Apply one server frame. Unknown syscalls and replies nobody waits on
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Payloads that do not match their syscall, and error replies.
    pub fn handle_frame(&mut self, frame: &Frame, now: i64) -> Result<(), EngineError> {
        match frame.status {
            Status::Done if frame.syscall == syscall::SESSION_JOIN => self.apply_join_reply(frame),
            Status::Error => Err(rejected(frame)),
            Status::Request if frame.syscall == syscall::GATEWAY_ERROR => Err(rejected(frame)),
            _ => {
                if let Some(event) = ServerEvent::from_frame(frame)? {
                    self.compositor.apply(event, now);
                }
                Ok(())
            }
        }
    }

    fn apply_join_reply(&mut self, frame: &Frame) -> Result<(), EngineError> {
        let reply = JoinReply::deserialize(&frame.data)
            .map_err(|source| EventError { syscall: frame.syscall.clone(), source })?;
        self.compositor.set_local_peer(reply.peer);
        self.compositor.set_roster(reply.roster);
        if let Some(history) = reply.history {
            self.compositor.replace_history(history);
        }
        Ok(())
    }

    // --- Outbound ---

    /// Show the in-progress shape locally and share it with peers.
    pub fn preview(&mut self, action: DrawAction) -> ClientRequest {
        self.compositor.set_local_preview(Some(action.clone()));
        ClientRequest::SendPreview(action)
    }

    /// Drop the local preview without committing it.
    pub fn cancel_preview(&mut self) {
        self.compositor.set_local_preview(None);
    }

    /// Commit an action locally and return the request that shares it.
    pub fn commit(&mut self, action: DrawAction, now: i64) -> ClientRequest {
        self.compositor.commit_local(action.clone(), now);
        ClientRequest::SendDraw(action)
    }
}

fn rejected(frame: &Frame) -> EngineError {
    EngineError::Rejected {
        syscall: frame.syscall.clone(),
        message: frame.error_message().unwrap_or("unknown error").to_owned(),
    }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser surface.
pub struct Engine {
    surface: CanvasSurface,
    pub core: EngineCore,
}

impl Engine {
    /// Create an engine bound to the given canvas element.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Surface` if the canvas has no 2D context.
    pub fn new(canvas: HtmlCanvasElement, config: OverlayConfig) -> Result<Self, EngineError> {
        let surface = CanvasSurface::new(canvas).map_err(|e| EngineError::Surface(format!("{e:?}")))?;
        Ok(Self { surface, core: EngineCore::new(config) })
    }

    /// Apply one inbound binary websocket message.
    ///
    /// # Errors
    ///
    /// See [`EngineCore::handle_bytes`].
    pub fn on_message(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        self.core.handle_bytes(bytes, frames::now_ms())
    }

    /// Convert pointer client coordinates to board coordinates.
    #[must_use]
    pub fn local_coordinates(&self, client_x: f64, client_y: f64) -> (f64, f64) {
        self.surface.local_coordinates(client_x, client_y)
    }

    /// Toggle peer name tags on cursors and laser pointers.
    pub fn set_show_labels(&mut self, show: bool) {
        self.core.compositor.set_show_labels(show);
    }

    /// Draw one frame. Failures are logged; the next tick tries again.
    pub fn render(&mut self) {
        if let Err(e) = self.core.compositor.render(&mut self.surface, frames::now_ms()) {
            console::error_2(&"canvas: render failed".into(), &e);
        }
    }
}

// =============================================================
// Render loop
// =============================================================

type TickCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// A running `requestAnimationFrame` loop. Dropping it stops the loop.
pub struct RenderLoop {
    window: web_sys::Window,
    handle: Rc<Cell<Option<i32>>>,
    callback: TickCallback,
}

/// Redraw `engine` on every display refresh until the returned loop is dropped.
///
/// # Errors
///
/// Returns `EngineError::NoWindow` outside a browser and
/// `EngineError::Surface` if the first frame cannot be scheduled.
pub fn start_render_loop(engine: Rc<RefCell<Engine>>) -> Result<RenderLoop, EngineError> {
    let window = web_sys::window().ok_or(EngineError::NoWindow)?;
    let callback: TickCallback = Rc::new(RefCell::new(None));
    let handle = Rc::new(Cell::new(None));

    let tick_window = window.clone();
    let tick_callback = Rc::clone(&callback);
    let tick_handle = Rc::clone(&handle);
    *callback.borrow_mut() = Some(Closure::new(move || {
        // Skip the tick if the host is mid-update; the next one catches up.
        if let Ok(mut engine) = engine.try_borrow_mut() {
            engine.render();
        }
        if let Some(next) = tick_callback.borrow().as_ref() {
            match tick_window.request_animation_frame(next.as_ref().unchecked_ref()) {
                Ok(id) => tick_handle.set(Some(id)),
                Err(e) => {
                    console::error_2(&"canvas: requestAnimationFrame failed".into(), &e);
                    tick_handle.set(None);
                }
            }
        }
    }));

    let first = match callback.borrow().as_ref() {
        Some(tick) => window
            .request_animation_frame(tick.as_ref().unchecked_ref())
            .map_err(|e| EngineError::Surface(format!("{e:?}")))?,
        None => return Err(EngineError::Surface("render callback missing".into())),
    };
    handle.set(Some(first));

    Ok(RenderLoop { window, handle, callback })
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        if let Some(id) = self.handle.take() {
            if let Err(e) = self.window.cancel_animation_frame(id) {
                console::warn_2(&"canvas: cancelAnimationFrame failed".into(), &e);
            }
        }
        // Breaks the closure's reference to itself.
        self.callback.borrow_mut().take();
    }
}

//! Canvas compositor for the shared whiteboard.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It keeps a
//! local view of the board (history replica plus ephemeral overlays), merges
//! server events into it, and redraws everything on each display refresh.
//! The host is responsible only for the websocket and for wiring DOM input to
//! the engine.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine, testable [`engine::EngineCore`], render loop |
//! | [`compositor`] | Layered composition and the [`compositor::Surface`] trait |
//! | [`overlay`] | Cursor, laser and preview records with TTL expiry |
//! | [`render`] | `Surface` implementation over a canvas 2D context |
//! | [`consts`] | Shared constants (lifetimes, stroke geometry, colors) |

pub mod compositor;
pub mod consts;
pub mod engine;
pub mod overlay;
pub mod render;

//! Session services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! `registry` and `history` own the only shared mutable state. `hub` is the
//! protocol state machine that drives them and fans events out, so the route
//! layer stays focused on frame decoding and transport.

pub mod history;
pub mod hub;
pub mod registry;

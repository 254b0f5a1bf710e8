//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! owns the single implicit session: the peer registry, the drawing history,
//! and the outbound channel of every live connection. There is exactly one
//! room, so nothing is keyed by board.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::config::Config;
use crate::frame::Frame;
use crate::services::history::History;
use crate::services::registry::Registry;

/// Connected clients: `connection_id` -> sender for outgoing frames.
pub type Clients = Arc<RwLock<HashMap<Uuid, mpsc::Sender<Frame>>>>;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Registry,
    pub history: History,
    pub clients: Clients,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let history = History::new(config.history_capacity);
        Self {
            config: Arc::new(config),
            registry: Registry::new(),
            history,
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

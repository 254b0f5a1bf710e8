//! Peer identity as it appears in rosters and join notifications.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lenient;

/// Fixed palette peers draw their identity color from.
pub const PEER_PALETTE: [&str; 15] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E9", "#F8B739", "#52C563",
    "#FF8B94", "#A8E6CF", "#FFD3B6", "#FFAAA5", "#FF8D89",
];

/// A joined participant. Created once per connection; `color` never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    /// Milliseconds since the Unix epoch.
    #[serde(deserialize_with = "lenient::int")]
    pub joined_at: i64,
    #[serde(default = "active_default")]
    pub active: bool,
}

fn active_default() -> bool {
    true
}

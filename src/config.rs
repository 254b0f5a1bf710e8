//! Server configuration from environment variables.
//!
//! Every value has a default; unparseable values fall back to it silently so a
//! typo in `.env` never keeps the server from starting.

use frames::history::DEFAULT_HISTORY_CAPACITY;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Maximum number of actions retained in the drawing history.
    pub history_capacity: usize,
    /// Outbound frames buffered per connection before fan-out drops.
    pub client_channel_capacity: usize,
    /// Send the current history to each peer when it joins.
    pub replay_on_join: bool,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            history_capacity: parse_or(&lookup, "WHITEBOARD_HISTORY_CAPACITY", DEFAULT_HISTORY_CAPACITY).max(1),
            client_channel_capacity: parse_or(
                &lookup,
                "WHITEBOARD_CLIENT_CHANNEL_CAPACITY",
                DEFAULT_CLIENT_CHANNEL_CAPACITY,
            )
            .max(1),
            replay_on_join: flag_or(&lookup, "WHITEBOARD_REPLAY_ON_JOIN", false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
            replay_on_join: false,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn flag_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

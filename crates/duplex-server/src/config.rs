//! Relay server configuration.
//!
//! Precedence: built-in defaults < `DUPLEX_*` environment variables <
//! command-line flags (applied by the binary). Env values are parsed
//! strictly — out-of-range or malformed values are ignored rather than
//! killing startup.

use serde::{Deserialize, Serialize};

/// Configuration for the relay server.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `3000`; `0` for auto-assign).
    pub port: u16,
    /// Seconds a disconnected user's record lingers before eviction.
    pub grace_window_secs: u64,
    /// Heartbeat Ping interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Seconds without a Pong before a client is disconnected.
    pub heartbeat_timeout_secs: u64,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Outbound event queue depth per connection.
    pub send_queue_capacity: usize,
    /// Lifetime send drops before a slow client is force-closed.
    pub max_send_drops: u64,
    /// Per-room history retention cap; `0` keeps everything.
    pub max_history_per_room: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            grace_window_secs: 300,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_connections: 1024,
            max_message_size: 64 * 1024,
            send_queue_capacity: 256,
            max_send_drops: 100,
            max_history_per_room: 0,
        }
    }
}

impl RelayConfig {
    /// Defaults overridden by any valid `DUPLEX_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply `DUPLEX_*` overrides to this config in place.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = read_env_string("DUPLEX_HOST") {
            self.host = v;
        }
        if let Some(v) = read_env_u64("DUPLEX_PORT", 0, 65535) {
            #[allow(clippy::cast_possible_truncation)]
            {
                self.port = v as u16;
            }
        }
        if let Some(v) = read_env_u64("DUPLEX_GRACE_WINDOW_SECS", 1, 86_400) {
            self.grace_window_secs = v;
        }
        if let Some(v) = read_env_u64("DUPLEX_HEARTBEAT_INTERVAL_SECS", 1, 3_600) {
            self.heartbeat_interval_secs = v;
        }
        if let Some(v) = read_env_u64("DUPLEX_HEARTBEAT_TIMEOUT_SECS", 1, 86_400) {
            self.heartbeat_timeout_secs = v;
        }
        if let Some(v) = read_env_usize("DUPLEX_MAX_CONNECTIONS", 1, 1_000_000) {
            self.max_connections = v;
        }
        if let Some(v) = read_env_usize("DUPLEX_MAX_MESSAGE_SIZE", 1, 16 * 1024 * 1024) {
            self.max_message_size = v;
        }
        if let Some(v) = read_env_usize("DUPLEX_SEND_QUEUE_CAPACITY", 1, 65_536) {
            self.send_queue_capacity = v;
        }
        if let Some(v) = read_env_u64("DUPLEX_MAX_SEND_DROPS", 1, 1_000_000) {
            self.max_send_drops = v;
        }
        if let Some(v) = read_env_usize("DUPLEX_MAX_HISTORY_PER_ROOM", 0, 10_000_000) {
            self.max_history_per_room = v;
        }
    }
}

// ── Pure parsing helpers (testable without touching the environment) ────────

/// Parse an unsigned integer within `[min, max]`; `None` otherwise.
#[must_use]
pub fn parse_u64_in_range(val: &str, min: u64, max: u64) -> Option<u64> {
    val.trim()
        .parse::<u64>()
        .ok()
        .filter(|v| (min..=max).contains(v))
}

fn read_env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn read_env_u64(key: &str, min: u64, max: u64) -> Option<u64> {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_u64_in_range(&v, min, max))
}

fn read_env_usize(key: &str, min: usize, max: usize) -> Option<usize> {
    read_env_u64(key, min as u64, max as u64).map(|v| {
        #[allow(clippy::cast_possible_truncation)]
        {
            v as usize
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.grace_window_secs, 300);
        assert_eq!(cfg.heartbeat_interval_secs, 30);
        assert_eq!(cfg.heartbeat_timeout_secs, 90);
        assert_eq!(cfg.max_history_per_room, 0);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = RelayConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: RelayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.port, cfg.port);
        assert_eq!(back.grace_window_secs, cfg.grace_window_secs);
        assert_eq!(back.max_send_drops, cfg.max_send_drops);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: RelayConfig = serde_json::from_str(r#"{"port": 8080}"#).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.grace_window_secs, 300);
    }

    #[test]
    fn parse_accepts_in_range() {
        assert_eq!(parse_u64_in_range("42", 1, 100), Some(42));
        assert_eq!(parse_u64_in_range(" 42 ", 1, 100), Some(42));
        assert_eq!(parse_u64_in_range("1", 1, 100), Some(1));
        assert_eq!(parse_u64_in_range("100", 1, 100), Some(100));
    }

    #[test]
    fn parse_rejects_out_of_range() {
        assert_eq!(parse_u64_in_range("0", 1, 100), None);
        assert_eq!(parse_u64_in_range("101", 1, 100), None);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_u64_in_range("", 1, 100), None);
        assert_eq!(parse_u64_in_range("abc", 1, 100), None);
        assert_eq!(parse_u64_in_range("-5", 1, 100), None);
        assert_eq!(parse_u64_in_range("4.2", 1, 100), None);
    }
}

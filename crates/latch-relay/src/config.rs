//! Relay server configuration
//!
//! Generalized from the teacher's `RelayConfig`: content-addressed rooms
//! become numeric slots, and the file-transfer-specific knobs (TLS certs,
//! multi-peer room capacity) are replaced with the STUN/TURN and slot
//! deadline knobs this signalling server actually needs.

use serde::{Deserialize, Serialize};

/// Relay server configuration, loadable from a TOML file or environment
/// variables via `clap`'s `env` feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// HTTP/WebSocket bind address.
    pub bind_addr: String,
    /// Maximum number of concurrent slots.
    pub max_slots: usize,
    /// Rate limit (connection attempts per second per IP).
    pub rate_limit: u32,
    /// How long a slot may sit in `awaiting_peer` before it is closed with
    /// `CloseSlotTimedOut`.
    pub slot_idle_secs: u64,
    /// How long a paired slot may run the handshake before both sides are
    /// closed. Must be at least as generous as the peer's fixed 30-second
    /// client-side deadline.
    pub handshake_deadline_secs: u64,
    /// STUN server URL handed to peers in every init frame (e.g.
    /// `stun:stun.l.google.com:19302`). Empty disables it.
    #[serde(default)]
    pub stun_endpoint: String,
    /// TURN server URL (e.g. `turn:turn.example.com:3478`). Empty disables
    /// TURN credential minting regardless of `turn_secret`.
    #[serde(default)]
    pub turn_endpoint: String,
    /// Shared secret used to mint short-lived TURN REST-API credentials.
    /// Empty disables TURN credential minting.
    #[serde(default)]
    pub turn_secret: String,
    /// TTL, in seconds, of minted TURN credentials.
    #[serde(default = "default_turn_ttl_secs")]
    pub turn_ttl_secs: u64,
    /// Relay-wide shared secret gating slot creation. Empty means the
    /// relay is open to anyone who can reach it.
    #[serde(default)]
    pub relay_secret: String,
}

fn default_turn_ttl_secs() -> u64 {
    3600
}

impl RelayConfig {
    /// Minimum slot idle timeout in seconds, preventing an accidental zero
    /// from meaning "never expire".
    const MIN_SLOT_IDLE_SECS: u64 = 10;

    /// The peer's fixed client-side handshake deadline (spec.md §4.3); the
    /// server's deadline must never be shorter than this.
    const MIN_HANDSHAKE_DEADLINE_SECS: u64 = 30;

    /// Validate and clamp configuration values loaded from a file or env.
    pub fn validate(&mut self) {
        if self.slot_idle_secs < Self::MIN_SLOT_IDLE_SECS {
            self.slot_idle_secs = Self::MIN_SLOT_IDLE_SECS;
        }
        if self.handshake_deadline_secs < Self::MIN_HANDSHAKE_DEADLINE_SECS {
            tracing::warn!(
                configured = self.handshake_deadline_secs,
                minimum = Self::MIN_HANDSHAKE_DEADLINE_SECS,
                "handshake_deadline_secs below the client's own deadline, clamping up"
            );
            self.handshake_deadline_secs = Self::MIN_HANDSHAKE_DEADLINE_SECS;
        }
        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::warn!(addr = %self.bind_addr, "invalid bind_addr, falling back to default");
            self.bind_addr = Self::default().bind_addr;
        }
    }

    /// Load configuration from a TOML file, falling back to defaults for
    /// any field the file omits.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            max_slots: 100_000,
            rate_limit: 100,
            slot_idle_secs: 45,
            handshake_deadline_secs: 45,
            stun_endpoint: String::new(),
            turn_endpoint: String::new(),
            turn_secret: String::new(),
            turn_ttl_secs: default_turn_ttl_secs(),
            relay_secret: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_already_valid() {
        let mut cfg = RelayConfig::default();
        let before = cfg.clone();
        cfg.validate();
        assert_eq!(before.slot_idle_secs, cfg.slot_idle_secs);
        assert_eq!(before.handshake_deadline_secs, cfg.handshake_deadline_secs);
    }

    #[test]
    fn handshake_deadline_is_clamped_above_client_deadline() {
        let mut cfg = RelayConfig {
            handshake_deadline_secs: 5,
            ..RelayConfig::default()
        };
        cfg.validate();
        assert!(cfg.handshake_deadline_secs >= 30);
    }

    #[test]
    fn invalid_bind_addr_falls_back_to_default() {
        let mut cfg = RelayConfig {
            bind_addr: "not-an-address".to_string(),
            ..RelayConfig::default()
        };
        cfg.validate();
        assert_eq!(cfg.bind_addr, RelayConfig::default().bind_addr);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg = RelayConfig::from_toml_str(
            r#"
            bind_addr = "127.0.0.1:9000"
            max_slots = 10
            rate_limit = 5
            slot_idle_secs = 60
            handshake_deadline_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.turn_secret, "");
    }
}

//! TURN REST-API credential minting
//!
//! Implements the widely-deployed "TURN REST API" convention (used by
//! coturn and others): a short-lived username of `<unix_ts>:<random>` and
//! a password of `base64(HMAC-SHA1(shared_secret, username))`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

use latch_protocol::wire::IceServer;

use crate::config::RelayConfig;

type HmacSha1 = Hmac<Sha1>;

/// A minted TURN credential pair, valid until `username`'s embedded
/// timestamp plus the configured TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnCredential {
    /// `<unix_ts>:<random>` username.
    pub username: String,
    /// base64-encoded HMAC-SHA1 password.
    pub credential: String,
}

/// Mint a TURN REST-API credential valid for `ttl_secs` from now, signed
/// with `shared_secret`.
pub fn mint(shared_secret: &str, ttl_secs: u64, now_unix: u64) -> TurnCredential {
    let expiry = now_unix + ttl_secs;
    let mut random_suffix = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut random_suffix);
    let username = format!("{}:{}", expiry, hex::encode(random_suffix));

    let mut mac = HmacSha1::new_from_slice(shared_secret.as_bytes())
        .expect("HMAC accepts a key of any length");
    mac.update(username.as_bytes());
    let credential = STANDARD.encode(mac.finalize().into_bytes());

    TurnCredential { username, credential }
}

/// Build the `iceServers` list for an init frame from the relay's
/// configuration: the configured STUN endpoint (if any) plus a freshly
/// minted TURN credential against the configured endpoint and secret (if
/// both are configured).
pub fn build_ice_servers(config: &RelayConfig) -> Vec<IceServer> {
    let mut servers = Vec::new();

    if !config.stun_endpoint.is_empty() {
        servers.push(IceServer {
            urls: vec![config.stun_endpoint.clone()],
            username: None,
            credential: None,
        });
    }

    if !config.turn_endpoint.is_empty() && !config.turn_secret.is_empty() {
        let now_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let cred = mint(&config.turn_secret, config.turn_ttl_secs, now_unix);
        servers.push(IceServer {
            urls: vec![config.turn_endpoint.clone()],
            username: Some(cred.username),
            credential: Some(cred.credential),
        });
    }

    servers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_produces_a_colon_separated_username() {
        let cred = mint("secret", 3600, 1_700_000_000);
        assert!(cred.username.starts_with("1700003600:"));
    }

    #[test]
    fn same_inputs_at_same_instant_differ_by_random_suffix() {
        let a = mint("secret", 3600, 1_700_000_000);
        let b = mint("secret", 3600, 1_700_000_000);
        assert_ne!(a.username, b.username);
    }

    #[test]
    fn credential_verifies_against_independently_computed_hmac() {
        let cred = mint("secret", 3600, 1_700_000_000);
        let mut mac = HmacSha1::new_from_slice(b"secret").unwrap();
        mac.update(cred.username.as_bytes());
        let expected = STANDARD.encode(mac.finalize().into_bytes());
        assert_eq!(cred.credential, expected);
    }

    #[test]
    fn ice_servers_empty_when_unconfigured() {
        let cfg = RelayConfig::default();
        assert!(build_ice_servers(&cfg).is_empty());
    }

    #[test]
    fn ice_servers_include_stun_without_turn_secret() {
        let cfg = RelayConfig {
            stun_endpoint: "stun:stun.example.com:3478".to_string(),
            ..RelayConfig::default()
        };
        let servers = build_ice_servers(&cfg);
        assert_eq!(servers.len(), 1);
        assert!(servers[0].username.is_none());
    }

    #[test]
    fn ice_servers_include_turn_when_fully_configured() {
        let cfg = RelayConfig {
            stun_endpoint: "stun:stun.example.com:3478".to_string(),
            turn_endpoint: "turn:turn.example.com:3478".to_string(),
            turn_secret: "s3cret".to_string(),
            ..RelayConfig::default()
        };
        let servers = build_ice_servers(&cfg);
        assert_eq!(servers.len(), 2);
        assert!(servers[1].username.is_some());
        assert!(servers[1].credential.is_some());
    }
}

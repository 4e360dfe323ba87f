//! Relay-wide authentication
//!
//! Subprotocol negotiation is checked before any socket is handed to the
//! slot table (see `websocket.rs`). Beyond that, the relay is open by
//! default; an operator can gate slot creation behind a shared secret
//! supplied out of band (e.g. to run a private relay for a small group).

use subtle::ConstantTimeEq;

/// Verify a client-supplied relay secret against the configured one.
///
/// An empty configured secret means the relay is open: any (or no) client
/// secret is accepted. A non-empty configured secret requires an exact,
/// constant-time match.
pub fn verify_relay_secret(configured: &str, supplied: Option<&str>) -> bool {
    if configured.is_empty() {
        return true;
    }
    match supplied {
        Some(s) => s.as_bytes().ct_eq(configured.as_bytes()).into(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_relay_accepts_anything() {
        assert!(verify_relay_secret("", None));
        assert!(verify_relay_secret("", Some("whatever")));
    }

    #[test]
    fn gated_relay_requires_exact_match() {
        assert!(verify_relay_secret("s3cret", Some("s3cret")));
        assert!(!verify_relay_secret("s3cret", Some("wrong")));
        assert!(!verify_relay_secret("s3cret", None));
    }
}

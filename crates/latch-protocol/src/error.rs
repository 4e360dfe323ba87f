//! Protocol-layer error taxonomy
//!
//! Every variant maps to, at most, one WebSocket close code so a peer can
//! always tell the relay exactly why it is giving up.

use thiserror::Error;

/// Errors surfaced by the handshake driver and the rendezvous wire protocol.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The rendezvous server rejected our subprotocol tag.
    #[error("subprotocol version mismatch")]
    BadVersion,

    /// The slot named in the URL does not exist (expired, never created, or
    /// already closed).
    #[error("no such slot")]
    NoSuchSlot,

    /// The server's slot pool is exhausted.
    #[error("no slots available")]
    NoMoreSlots,

    /// The handshake did not complete before its deadline.
    #[error("handshake timed out")]
    TimedOut,

    /// A sealed frame failed to authenticate — the passphrase does not match.
    #[error("bad key: passphrase mismatch")]
    BadKey,

    /// The peer closed its rendezvous socket before the handshake finished.
    #[error("peer hung up")]
    PeerHungUp,

    /// The rendezvous socket or peer connection failed at the transport layer.
    #[error("transport error: {0}")]
    Transport(String),

    /// A message violated the wire protocol (wrong frame type, malformed
    /// JSON, binary frame where a text frame was required, …).
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl ProtocolError {
    /// The WebSocket close code a peer or the relay should send for this
    /// error, if the taxonomy defines one.
    pub fn close_code(&self) -> Option<u16> {
        match self {
            ProtocolError::NoSuchSlot => Some(4000),
            ProtocolError::TimedOut => Some(4001),
            ProtocolError::NoMoreSlots => Some(4002),
            ProtocolError::BadVersion => Some(4003),
            ProtocolError::PeerHungUp => Some(4004),
            ProtocolError::BadKey => Some(4005),
            ProtocolError::Transport(_) | ProtocolError::ProtocolViolation(_) => None,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::ProtocolViolation(format!("invalid JSON: {e}"))
    }
}

impl From<latch_crypto::CryptoError> for ProtocolError {
    fn from(e: latch_crypto::CryptoError) -> Self {
        match e {
            latch_crypto::CryptoError::Decryption(_) => ProtocolError::BadKey,
            other => ProtocolError::Transport(other.to_string()),
        }
    }
}

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

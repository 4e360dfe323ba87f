//! Network-layer error taxonomy
//!
//! Like [`latch_protocol::ProtocolError`], every variant that corresponds to
//! a protocol-level failure carries the same close code so a peer's
//! rendezvous socket closes with a reason the other side (and the relay)
//! can act on.

use thiserror::Error;

/// Errors surfaced by the rendezvous WebSocket client and the webrtc-backed
/// peer connection.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// The rendezvous WebSocket failed to connect or dropped unexpectedly.
    #[error("rendezvous socket error: {0}")]
    Socket(String),

    /// The relay rejected our subprotocol tag.
    #[error("subprotocol version mismatch")]
    BadVersion,

    /// The slot named in the URL does not exist.
    #[error("no such slot")]
    NoSuchSlot,

    /// The relay's slot pool is exhausted.
    #[error("no slots available")]
    NoMoreSlots,

    /// The handshake did not complete before its deadline.
    #[error("handshake timed out")]
    TimedOut,

    /// A sealed frame failed to authenticate.
    #[error("bad key: passphrase mismatch")]
    BadKey,

    /// The peer hung up before the handshake finished.
    #[error("peer hung up")]
    PeerHungUp,

    /// The webrtc peer connection failed.
    #[error("peer connection error: {0}")]
    PeerConnection(String),

    /// A wire-protocol error bubbled up from `latch-protocol`.
    #[error(transparent)]
    Protocol(#[from] latch_protocol::ProtocolError),
}

impl NetworkError {
    /// The WebSocket close code to send for this error, if the protocol
    /// taxonomy defines one.
    pub fn close_code(&self) -> Option<u16> {
        match self {
            NetworkError::NoSuchSlot => Some(4000),
            NetworkError::TimedOut => Some(4001),
            NetworkError::NoMoreSlots => Some(4002),
            NetworkError::BadVersion => Some(4003),
            NetworkError::PeerHungUp => Some(4004),
            NetworkError::BadKey => Some(4005),
            NetworkError::Protocol(e) => e.close_code(),
            NetworkError::Socket(_) | NetworkError::PeerConnection(_) => None,
        }
    }
}

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        Self::Socket(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for NetworkError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Socket(err.to_string())
    }
}

impl From<webrtc::Error> for NetworkError {
    fn from(err: webrtc::Error) -> Self {
        Self::PeerConnection(err.to_string())
    }
}

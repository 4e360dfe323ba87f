//! Peer-side networking for latch: the rendezvous WebSocket client and the
//! `webrtc`-backed `PeerConnection` implementation.
//!
//! Everything here is the "real" half of the two small capability
//! boundaries `latch-protocol` defines — `latch_protocol::handshake::FrameSink`
//! and `latch_protocol::peer::PeerConnection` — so the protocol crate itself
//! never depends on `tokio-tungstenite` or `webrtc`.

#![forbid(unsafe_code)]

pub mod error;
pub mod ice;
pub mod peer;
pub mod signaling;

pub use error::NetworkError;
pub use peer::WebRtcPeerConnection;
pub use signaling::SignalingClient;

/// Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

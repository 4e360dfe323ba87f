//! Wire protocol, slot/passphrase codec, and peer handshake state machine
//! for latch.
//!
//! This crate is transport-agnostic: it knows the three rendezvous frame
//! shapes and how to drive a [`peer::PeerConnection`] through a handshake,
//! but nothing about WebSockets or `webrtc` itself. `latch-net` supplies
//! both.

#![forbid(unsafe_code)]

pub mod error;
pub mod handshake;
pub mod peer;
pub mod slot;
pub mod wire;

pub use error::{ProtocolError, Result};
pub use handshake::{HandshakeDriver, Role};

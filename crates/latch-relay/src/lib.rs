//! The slot rendezvous relay: the untrusted courier between two peers
//! running the `latch-protocol` handshake.
//!
//! This crate never reads a sealed frame or a PAKE message — it only
//! allocates slots, pairs the two sockets that join one, and forwards text
//! frames opaquely between them.

pub mod auth;
pub mod config;
pub mod rate_limit;
pub mod signaling;
pub mod slot;
pub mod turn;
pub mod websocket;

pub use config::RelayConfig;
pub use websocket::{router, RelayState};

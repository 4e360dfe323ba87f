//! Authenticated encryption for sealed handshake frames
//!
//! The handshake only ever encrypts short, already-framed messages
//! (session descriptions and ICE candidates) under a single session key,
//! so this module is deliberately narrow: one cipher, one frame shape.

pub mod seal;

pub use seal::{open, seal as seal_frame, NONCE_LEN};

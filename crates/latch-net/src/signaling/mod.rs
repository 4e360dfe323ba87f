//! The rendezvous WebSocket client
//!
//! Dials the relay, negotiates the subprotocol, reads the init frame, and
//! then acts as both ends of the handshake driver's wiring: a
//! [`latch_protocol::handshake::FrameSink`] for the writer task, and a
//! source of incoming frames the handshake driver feeds into its own
//! `on_pake_frame`/`on_sealed_payload` methods.

pub mod client;

pub use client::{close_frame_to_error, IncomingFrame, SignalingClient, SignalingReader, SignalingWriter};

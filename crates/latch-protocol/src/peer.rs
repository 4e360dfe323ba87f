//! Peer-connection capability trait
//!
//! The handshake driver needs only a small capability set from whatever
//! WebRTC stack backs it: create/accept descriptions, add trickled
//! candidates, and learn about connection state. Defining that set here,
//! rather than alongside a concrete `webrtc` crate implementation, keeps
//! ICE/DTLS/SCTP machinery out of the core protocol crate — `latch-net`
//! depends on `latch-protocol` to implement this trait, not the reverse.

use crate::error::Result;
use crate::wire::{IceCandidate, SessionDescription};

/// Coarse connection lifecycle, mirroring the subset of
/// `RTCPeerConnectionState` the driver needs to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// ICE/DTLS negotiation in progress.
    Connecting,
    /// A usable data path exists.
    Connected,
    /// The data path was lost; may recover.
    Disconnected,
    /// Negotiation failed permanently.
    Failed,
    /// The connection was closed locally.
    Closed,
}

/// Which kind of candidate pair a completed connection settled on, used to
/// pick the success close code (spec.md §4.3/§8 Scenario 1: 4006/4007/4008
/// for host/srflx-or-prflx/relay respectively).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// Both sides nominated a host candidate: same local network, no NAT
    /// traversal needed.
    Host,
    /// The winning pair is server- or peer-reflexive on at least one side —
    /// direct peer-to-peer through NAT, no TURN relay carrying media.
    Reflexive,
    /// The winning candidate pair routes through a TURN relay.
    Relayed,
}

/// The capability set the handshake driver needs from a WebRTC peer
/// connection.
///
/// A real implementation wraps `webrtc::peer_connection::RTCPeerConnection`;
/// tests use an in-memory fake that reports `Connected` once both
/// descriptions and a candidate have flowed.
#[allow(async_fn_in_trait)]
pub trait PeerConnection: Send {
    /// Generate a local offer and set it as the local description.
    async fn create_offer(&mut self) -> Result<SessionDescription>;

    /// Accept a remote offer, set it as the remote description, and
    /// generate a matching answer as the new local description.
    async fn create_answer(&mut self, remote: SessionDescription) -> Result<SessionDescription>;

    /// Set a remote description received as an answer.
    async fn set_remote_description(&mut self, remote: SessionDescription) -> Result<()>;

    /// Add a single trickled remote ICE candidate.
    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<()>;

    /// Register a callback invoked once per locally gathered candidate,
    /// and once more with `None` when gathering completes.
    fn on_ice_candidate(&mut self, callback: Box<dyn FnMut(Option<IceCandidate>) + Send>);

    /// Register a callback invoked whenever the connection's state changes.
    fn on_connection_state_change(&mut self, callback: Box<dyn FnMut(ConnectionState) + Send>);

    /// Report which kind of candidate pair the connection settled on, once
    /// connected. `None` before a pair has been selected.
    fn connection_kind(&self) -> Option<ConnectionKind>;

    /// Tear the connection down.
    async fn close(&mut self);
}

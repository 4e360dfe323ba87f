//! Peer handshake state machine
//!
//! One type, two roles: `Role::Initiator` opens a slot and waits; `Role::Joiner`
//! dials in with the out-of-band passphrase. Both drive the same `S0..S5`
//! progression, just on opposite sides of the PAKE and the SDP offer/answer.
//!
//! Sends never touch the rendezvous socket directly. Every outgoing frame —
//! PAKE bytes before the session key exists, sealed payloads after — goes
//! onto an mpsc channel consumed by a single writer task, so a candidate
//! trickling in from the peer-connection's callback and a driver-initiated
//! send can never interleave or race on the socket.

use std::sync::Arc;

use tokio::sync::{mpsc, OnceCell};

use latch_crypto::{Initiator, JoinerState};

use crate::error::{ProtocolError, Result};
use crate::peer::PeerConnection;
use crate::slot::SlotId;
use crate::wire::{decode_frame, encode_frame, IceCandidate, SealedPayload, SessionDescription};

/// Which side of the passphrase a driver is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Created the slot, holds the passphrase, waits for a joiner.
    Initiator,
    /// Dialed in with a passphrase read out of band.
    Joiner,
}

/// Handshake progress, restated from spec.md §4.3.
#[derive(Debug)]
enum State {
    /// Rendezvous socket not yet connected.
    S0Created,
    /// Init frame received; PAKE message sent, awaiting the peer's.
    S1AwaitingPeer,
    /// Session key derived from the shared master key.
    S2KeyEstablished,
    /// Offer and answer have both been exchanged.
    S3DescriptionsExchanged,
    /// Candidates trickling in either direction.
    S4GatheringCandidates,
    /// Peer connection reports a usable data path.
    S5Connected,
}

/// Queue item for the rendezvous socket's single writer task.
///
/// The two variants exist so a sealed send cannot be constructed before a
/// session key does: [`WriterItem::PostK`] carries plaintext that the
/// writer task seals itself, pulling the key from a cell it alone reads.
pub enum WriterItem {
    /// A raw PAKE message, sent base64url-encoded and unauthenticated.
    PreK(Vec<u8>),
    /// A payload to seal under the session key once it exists, then send.
    PostK(SealedPayload),
}

/// Minimal text-frame sink the writer task sends through.
///
/// `latch-net`'s `SignalingClient` implements this over a
/// `tokio-tungstenite` WebSocket; tests can implement it over an
/// in-memory channel.
#[allow(async_fn_in_trait)]
pub trait FrameSink: Send {
    /// Send one text frame.
    async fn send_frame(&mut self, text: String) -> Result<()>;
}

/// Drain `rx`, sealing `PostK` items under `session_key` once it is set and
/// forwarding everything to `sink` as base64url text frames.
///
/// Exits when the channel closes or a send to `sink` fails, handing `sink`
/// back so the caller can send one last out-of-band frame (a close code,
/// say) once every writer-task producer has been dropped.
pub async fn run_writer<S: FrameSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<WriterItem>,
    session_key: Arc<OnceCell<[u8; 32]>>,
) -> S {
    while let Some(item) = rx.recv().await {
        let text = match item {
            WriterItem::PreK(bytes) => encode_frame(&bytes),
            WriterItem::PostK(payload) => {
                let Some(key) = session_key.get() else {
                    tracing::error!("dropped a sealed send: session key not yet established");
                    continue;
                };
                let plaintext = match payload.to_plaintext() {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode sealed payload");
                        continue;
                    }
                };
                match latch_crypto::seal_frame(key, &plaintext) {
                    Ok(frame) => encode_frame(&frame),
                    Err(e) => {
                        tracing::error!(error = %e, "failed to seal frame");
                        continue;
                    }
                }
            }
        };

        if let Err(e) = sink.send_frame(text).await {
            tracing::error!(error = %e, "writer task send failed, stopping");
            break;
        }
    }
    sink
}

/// Register the candidate emitter on `peer`.
///
/// The callback closes over a cloned writer handle, never the driver or
/// peer connection itself, so there is no cyclic reference between the
/// handshake driver and the peer connection it owns.
pub fn install_candidate_emitter<P: PeerConnection>(peer: &mut P, writer: mpsc::Sender<WriterItem>) {
    peer.on_ice_candidate(Box::new(move |candidate| {
        let item = match candidate {
            Some(c) => WriterItem::PostK(SealedPayload::Candidate(c)),
            None => WriterItem::PostK(SealedPayload::Candidate(IceCandidate::end_of_candidates())),
        };
        if writer.try_send(item).is_err() {
            tracing::warn!("dropped a candidate: writer queue full or closed");
        }
    }));
}

/// Drives one peer through the handshake: PAKE, SDP exchange, and candidate
/// trickling, against a `PeerConnection` and a writer-task handle.
pub struct HandshakeDriver<P: PeerConnection> {
    role: Role,
    state: State,
    peer: P,
    writer: mpsc::Sender<WriterItem>,
    session_key: Arc<OnceCell<[u8; 32]>>,
    passphrase: String,
    pending_joiner: Option<JoinerState>,
}

impl<P: PeerConnection> HandshakeDriver<P> {
    /// Build a driver in its initial state. `session_key` should be a fresh,
    /// unset cell shared with the writer task spawned via [`run_writer`].
    pub fn new(role: Role, peer: P, writer: mpsc::Sender<WriterItem>, session_key: Arc<OnceCell<[u8; 32]>>) -> Self {
        Self {
            role,
            state: State::S0Created,
            peer,
            writer,
            session_key,
            passphrase: String::new(),
            pending_joiner: None,
        }
    }

    /// Called once the init frame has arrived: starts the PAKE exchange.
    pub async fn begin(&mut self, passphrase: &str, slot: SlotId) -> Result<()> {
        if !matches!(self.state, State::S0Created) {
            return Err(ProtocolError::ProtocolViolation(
                "begin() called outside S0".into(),
            ));
        }

        self.passphrase = passphrase.to_string();
        let context = slot.0.to_string();

        if self.role == Role::Joiner {
            let (msg_b, joiner_state) = JoinerState::start(passphrase, context.as_bytes());
            self.pending_joiner = Some(joiner_state);
            self.send_raw(msg_b).await?;
        }

        self.state = State::S1AwaitingPeer;
        Ok(())
    }

    /// Feed a raw (pre-key) PAKE frame received on the rendezvous socket.
    pub async fn on_pake_frame(&mut self, text: &str, slot: SlotId) -> Result<()> {
        if !matches!(self.state, State::S1AwaitingPeer) {
            return Err(ProtocolError::ProtocolViolation(
                "PAKE frame received outside S1".into(),
            ));
        }

        let bytes = decode_frame(text)?;
        let context = slot.0.to_string();

        let master_key = match self.role {
            Role::Initiator => {
                let (msg_a, master_key) = Initiator::exchange(&self.passphrase, context.as_bytes(), &bytes)?;
                self.send_raw(msg_a).await?;
                master_key
            }
            Role::Joiner => {
                let joiner = self.pending_joiner.take().ok_or_else(|| {
                    ProtocolError::ProtocolViolation("joiner PAKE state missing".into())
                })?;
                joiner.finish(&bytes)?
            }
        };

        let session_key = latch_crypto::kdf::session_key(&master_key)?;
        self.session_key
            .set(session_key)
            .map_err(|_| ProtocolError::ProtocolViolation("session key set twice".into()))?;
        self.state = State::S2KeyEstablished;

        if self.role == Role::Initiator {
            let offer = self.peer.create_offer().await.map_err(|e| ProtocolError::Transport(e.to_string()))?;
            self.send_sealed(SealedPayload::Offer(offer)).await?;
        }

        Ok(())
    }

    /// Feed a sealed payload, already opened by the caller using the
    /// session key this driver published to the writer task's cell.
    pub async fn on_sealed_payload(&mut self, payload: SealedPayload) -> Result<()> {
        match (self.role, payload) {
            (Role::Joiner, SealedPayload::Offer(sdp)) if self.in_description_phase() => {
                let answer = self.peer.create_answer(sdp).await.map_err(|e| ProtocolError::Transport(e.to_string()))?;
                self.send_sealed(SealedPayload::Answer(answer)).await?;
                self.state = State::S3DescriptionsExchanged;
            }
            (Role::Initiator, SealedPayload::Answer(sdp)) if self.in_description_phase() => {
                self.peer
                    .set_remote_description(sdp)
                    .await
                    .map_err(|e| ProtocolError::Transport(e.to_string()))?;
                self.state = State::S3DescriptionsExchanged;
            }
            (_, SealedPayload::Candidate(candidate)) if candidate.is_end_of_candidates() => {
                // The peer has no more candidates; our own gathering and
                // connection-state callback still govern S5.
            }
            (_, SealedPayload::Candidate(candidate)) => {
                self.on_remote_candidate(candidate).await?;
            }
            (_, SealedPayload::Bye) => {
                return Err(ProtocolError::BadKey);
            }
            _ => {
                return Err(ProtocolError::ProtocolViolation(
                    "sealed payload invalid for current role/state".into(),
                ));
            }
        }
        Ok(())
    }

    /// Mark the handshake complete once the peer connection reports a
    /// usable data path, returning the kind of pair it settled on.
    pub fn mark_connected(&mut self, kind: crate::peer::ConnectionKind) {
        self.state = State::S5Connected;
        let _ = kind;
    }

    /// Whether [`mark_connected`] has been called.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, State::S5Connected)
    }

    /// Which kind of candidate pair the underlying peer connection settled
    /// on, once it has one. `None` before a pair has been selected.
    pub fn connection_kind(&self) -> Option<crate::peer::ConnectionKind> {
        self.peer.connection_kind()
    }

    /// Send a sealed "bye" farewell after a sealed-frame open failure.
    ///
    /// Per spec.md §4.3/§7, a failed `open` must immediately send this
    /// farewell and close the rendezvous socket with `CloseBadKey` (4005).
    /// The caller owns the socket and does the actual close; this only
    /// enqueues the farewell onto the writer task, which requires a
    /// session key to already exist — true by construction, since `open`
    /// can only have been attempted after one was derived.
    pub async fn fail_bad_key(&self) -> Result<()> {
        self.send_sealed(SealedPayload::Bye).await
    }

    async fn on_remote_candidate(&mut self, candidate: IceCandidate) -> Result<()> {
        if !self.in_description_phase() && !matches!(self.state, State::S4GatheringCandidates) {
            return Err(ProtocolError::ProtocolViolation(
                "candidate received before descriptions exchanged".into(),
            ));
        }
        self.peer
            .add_ice_candidate(candidate)
            .await
            .map_err(|e| ProtocolError::Transport(e.to_string()))?;
        self.state = State::S4GatheringCandidates;
        Ok(())
    }

    fn in_description_phase(&self) -> bool {
        matches!(self.state, State::S2KeyEstablished | State::S3DescriptionsExchanged)
    }

    async fn send_raw(&self, bytes: Vec<u8>) -> Result<()> {
        self.writer
            .send(WriterItem::PreK(bytes))
            .await
            .map_err(|_| ProtocolError::Transport("writer task gone".into()))
    }

    async fn send_sealed(&self, payload: SealedPayload) -> Result<()> {
        self.writer
            .send(WriterItem::PostK(payload))
            .await
            .map_err(|_| ProtocolError::Transport("writer task gone".into()))
    }
}

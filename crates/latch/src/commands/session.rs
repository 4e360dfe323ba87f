//! Shared handshake-driving logic for both `latch new` and `latch join`
//!
//! Wires a [`SignalingClient`] and a [`WebRtcPeerConnection`] together
//! through a [`HandshakeDriver`], the way the protocol crate's own test
//! harness does with its fakes, but over the real transports `latch-net`
//! provides.

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use tokio::sync::{mpsc, OnceCell};
use tokio::time::timeout;

use latch_net::signaling::{close_frame_to_error, IncomingFrame, SignalingClient};
use latch_net::NetworkError;
use latch_net::WebRtcPeerConnection;
use latch_protocol::handshake::{install_candidate_emitter, run_writer, HandshakeDriver, Role};
use latch_protocol::peer::{ConnectionKind, ConnectionState, PeerConnection};
use latch_protocol::slot::{self, SlotId};
use latch_protocol::wire::{decode_frame, SealedPayload};

/// Overall handshake deadline, matching `latch-relay`'s minimum
/// `handshake_deadline_secs` so a peer never outlives the slot holding it.
const HANDSHAKE_DEADLINE: Duration = Duration::from_secs(30);

/// Outcome of a completed handshake, for the command layer to report.
pub struct Completed {
    pub slot: SlotId,
    pub kind: ConnectionKind,
    pub session_key: [u8; 32],
}

/// Create a new slot and wait for a peer to join with the generated
/// passphrase, returning it once it is known so the caller can print it
/// before the handshake finishes.
pub async fn create_slot(relay: &str) -> anyhow::Result<(SignalingClient, SlotId, String, Vec<latch_protocol::wire::IceServer>)> {
    let (client, init) = SignalingClient::new_slot(relay).await?;
    let slot: SlotId = init.slot.parse()?;

    let mut random_bytes = [0u8; 2];
    rand::thread_rng().fill_bytes(&mut random_bytes);
    let passphrase = slot::encode(slot, random_bytes);

    Ok((client, slot, passphrase, init.ice_servers))
}

/// Join an existing slot named in `passphrase`.
pub async fn join_slot(relay: &str, passphrase: &str) -> anyhow::Result<(SignalingClient, SlotId, Vec<latch_protocol::wire::IceServer>)> {
    let (slot, _random) = slot::decode(passphrase)?;
    let (client, init) = SignalingClient::join_slot(relay, &slot.to_string()).await?;
    Ok((client, slot, init.ice_servers))
}

/// Drive one peer's side of the handshake to completion (or failure).
pub async fn run(
    role: Role,
    client: SignalingClient,
    slot: SlotId,
    passphrase: &str,
    ice_servers: &[latch_protocol::wire::IceServer],
) -> anyhow::Result<Completed> {
    timeout(HANDSHAKE_DEADLINE, run_inner(role, client, slot, passphrase, ice_servers))
        .await
        .map_err(|_| anyhow::anyhow!("handshake timed out"))?
}

async fn run_inner(
    role: Role,
    client: SignalingClient,
    slot: SlotId,
    passphrase: &str,
    ice_servers: &[latch_protocol::wire::IceServer],
) -> anyhow::Result<Completed> {
    let (mut reader, writer) = client.split();

    let mut peer = WebRtcPeerConnection::new(ice_servers).await?;

    let (writer_tx, writer_rx) = mpsc::channel(32);
    let session_key: Arc<OnceCell<[u8; 32]>> = Arc::new(OnceCell::new());

    install_candidate_emitter(&mut peer, writer_tx.clone());

    let (state_tx, mut state_rx) = mpsc::channel::<ConnectionState>(8);
    peer.on_connection_state_change(Box::new(move |state| {
        let _ = state_tx.try_send(state);
    }));

    let mut driver = HandshakeDriver::new(role, peer, writer_tx.clone(), session_key.clone());
    drop(writer_tx);

    let writer_task = tokio::spawn(run_writer(writer, writer_rx, session_key.clone()));

    driver.begin(passphrase, slot).await?;

    let mut pake_done = false;
    let kind = loop {
        tokio::select! {
            frame = reader.next_frame() => {
                match frame? {
                    IncomingFrame::Frame(text) => {
                        if !pake_done {
                            driver.on_pake_frame(&text, slot).await?;
                            pake_done = true;
                        } else {
                            let key = session_key
                                .get()
                                .ok_or_else(|| anyhow::anyhow!("sealed frame received before session key was established"))?;
                            let bytes = decode_frame(&text)?;
                            let opened = latch_crypto::open(key, &bytes);
                            let plaintext = match opened {
                                Ok(p) => p,
                                Err(_) => {
                                    // spec.md §4.3/§7: a failed `open` sends a sealed
                                    // "bye" and closes with `CloseBadKey` before
                                    // surfacing the error to the caller.
                                    let _ = driver.fail_bad_key().await;
                                    drop(driver);
                                    if let Ok(mut writer) = writer_task.await {
                                        let _ = writer.close_with_code(4005).await;
                                    }
                                    return Err(NetworkError::BadKey.into());
                                }
                            };
                            let payload = SealedPayload::from_plaintext(&plaintext)?;
                            driver.on_sealed_payload(payload).await?;
                        }
                    }
                    IncomingFrame::Closed(code) => {
                        return Err(close_frame_to_error(code).into());
                    }
                }
            }
            Some(state) = state_rx.recv() => {
                if state == ConnectionState::Connected {
                    if let Some(kind) = driver.connection_kind() {
                        break kind;
                    }
                }
                if state == ConnectionState::Failed {
                    anyhow::bail!("peer connection failed");
                }
            }
        }
    };

    driver.mark_connected(kind);
    drop(driver);

    let key = *session_key
        .get()
        .expect("session key is set before a connection can be established");

    let mut writer = writer_task.await?;
    let close_code = match kind {
        ConnectionKind::Host => 4006,
        ConnectionKind::Reflexive => 4007,
        ConnectionKind::Relayed => 4008,
    };
    let _ = writer.close_with_code(close_code).await;

    Ok(Completed { slot, kind, session_key: key })
}

//! The forwarding loop for one rendezvous socket
//!
//! Replaces the teacher's `todo!()`-stubbed `SignalingHandler`. The relay
//! never looks inside a frame: it sends the init frame once, then shuttles
//! whatever text arrives between this socket and its paired peer until
//! either side closes.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message as WsMsg, Utf8Bytes, WebSocket};
use futures::{SinkExt, StreamExt};

use latch_protocol::slot::SlotId;
use latch_protocol::wire::{IceServer, InitFrame};

use crate::slot::{PeerFrame, SlotTable};

/// Close codes defined by the taxonomy (spec.md §6); anything else a peer
/// sends is collapsed to `ClosePeerHungUp` before being forwarded.
const PROTOCOL_CLOSE_CODES: [u16; 6] = [4000, 4001, 4002, 4003, 4004, 4005];
const CLOSE_PEER_HUNG_UP: u16 = 4004;
const CLOSE_SLOT_TIMED_OUT: u16 = 4001;

fn normalize_close_code(code: u16) -> u16 {
    if PROTOCOL_CLOSE_CODES.contains(&code) {
        code
    } else {
        CLOSE_PEER_HUNG_UP
    }
}

fn close_message(code: u16) -> WsMsg {
    WsMsg::Close(Some(CloseFrame {
        code,
        reason: Utf8Bytes::from_static(""),
    }))
}

/// Drive one socket's side of a slot: send the init frame, then forward
/// frames bidirectionally between the socket and the paired peer until
/// either side closes or the handshake deadline elapses.
pub async fn run_session(
    socket: WebSocket,
    slot_table: Arc<SlotTable>,
    slot_id: SlotId,
    is_first: bool,
    mut peer_rx: crate::slot::PeerReceiver,
    ice_servers: Vec<IceServer>,
    handshake_deadline: Duration,
) {
    let (mut sink, mut stream) = socket.split();

    let init = InitFrame {
        slot: slot_id.to_string(),
        ice_servers,
    };
    let init_json = match init.to_json() {
        Ok(j) => j,
        Err(e) => {
            tracing::error!(error = %e, slot = %slot_id, "failed to encode init frame");
            slot_table.close(slot_id);
            return;
        }
    };
    if sink.send(WsMsg::Text(init_json.into())).await.is_err() {
        slot_table.close(slot_id);
        return;
    }

    let deadline = tokio::time::sleep(handshake_deadline);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(WsMsg::Text(text))) => {
                        slot_table.touch(slot_id);
                        if let Some(sender) = slot_table.peer_sender(slot_id, is_first) {
                            if sender.send(PeerFrame::Text(text.to_string())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(WsMsg::Binary(_))) => {
                        tracing::warn!(slot = %slot_id, "binary frame is a protocol error");
                        let _ = sink.send(close_message(CLOSE_PEER_HUNG_UP)).await;
                        if let Some(sender) = slot_table.peer_sender(slot_id, is_first) {
                            let _ = sender.send(PeerFrame::Close(CLOSE_PEER_HUNG_UP)).await;
                        }
                        break;
                    }
                    Some(Ok(WsMsg::Close(frame))) => {
                        let code = frame.map(|f| f.code).unwrap_or(CLOSE_PEER_HUNG_UP);
                        if code == 4005 {
                            // Single-guess enforcement: a `BadKey` close
                            // permanently retires this slot id.
                            slot_table.lock_bad_key(slot_id);
                        }
                        if let Some(sender) = slot_table.peer_sender(slot_id, is_first) {
                            let _ = sender.send(PeerFrame::Close(normalize_close_code(code))).await;
                        }
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(_)) | None => {
                        if let Some(sender) = slot_table.peer_sender(slot_id, is_first) {
                            let _ = sender.send(PeerFrame::Close(CLOSE_PEER_HUNG_UP)).await;
                        }
                        break;
                    }
                }
            }
            forwarded = peer_rx.recv() => {
                match forwarded {
                    Some(PeerFrame::Text(text)) => {
                        if sink.send(WsMsg::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(PeerFrame::Close(code)) => {
                        let _ = sink.send(close_message(code)).await;
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut deadline => {
                tracing::info!(slot = %slot_id, "handshake deadline elapsed");
                let _ = sink.send(close_message(CLOSE_SLOT_TIMED_OUT)).await;
                if let Some(sender) = slot_table.peer_sender(slot_id, is_first) {
                    let _ = sender.send(PeerFrame::Close(CLOSE_SLOT_TIMED_OUT)).await;
                }
                break;
            }
        }
    }

    slot_table.close(slot_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_protocol_codes_pass_through_unchanged() {
        for code in PROTOCOL_CLOSE_CODES {
            assert_eq!(normalize_close_code(code), code);
        }
    }

    #[test]
    fn unknown_codes_collapse_to_peer_hung_up() {
        assert_eq!(normalize_close_code(1000), CLOSE_PEER_HUNG_UP);
        assert_eq!(normalize_close_code(9999), CLOSE_PEER_HUNG_UP);
    }
}

//! End-to-end rendezvous + PAKE handshake against an in-process relay.
//!
//! Drives both peer roles over real `tokio-tungstenite` WebSocket clients
//! against a `latch-relay` instance bound to an ephemeral localhost port,
//! exercising the slot allocation, subprotocol check, PAKE exchange, and
//! sealed-frame authentication end to end (spec.md §8, Scenarios 1-4).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, OnceCell};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use latch_crypto::{kdf, Initiator, JoinerState};
use latch_protocol::error::{ProtocolError, Result as ProtocolResult};
use latch_protocol::handshake::{run_writer, FrameSink, HandshakeDriver, Role};
use latch_protocol::peer::{ConnectionKind, ConnectionState, PeerConnection};
use latch_protocol::wire::{decode_frame, encode_frame, IceCandidate, InitFrame, SessionDescription, SUBPROTOCOL};
use latch_relay::{config::RelayConfig, router, RelayState};

async fn spawn_relay(mut config: RelayConfig) -> SocketAddr {
    config.bind_addr = "127.0.0.1:0".to_string();
    config.handshake_deadline_secs = 30;
    let state = Arc::new(RelayState::new(config));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    // Give the listener a moment to start accepting.
    tokio::time::sleep(Duration::from_millis(20)).await;
    addr
}

fn ws_url(addr: SocketAddr, path: &str) -> String {
    format!("ws://{addr}{path}")
}

async fn connect_with_protocol(url: &str, protocol: &str) -> tokio_tungstenite::tungstenite::Result<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
> {
    let mut request = url.into_client_request().unwrap();
    request
        .headers_mut()
        .insert("sec-websocket-protocol", protocol.parse().unwrap());
    let (stream, _response) = tokio_tungstenite::connect_async(request).await?;
    Ok(stream)
}

/// A `PeerConnection` that never actually negotiates anything. Good enough
/// to drive `HandshakeDriver` through the PAKE and sealed-offer steps,
/// which is all the bad-key teardown path below touches.
#[derive(Default)]
struct FakePeer;

impl PeerConnection for FakePeer {
    async fn create_offer(&mut self) -> ProtocolResult<SessionDescription> {
        Ok(SessionDescription { sdp_type: "offer".into(), sdp: "v=0 fake-offer".into() })
    }
    async fn create_answer(&mut self, _remote: SessionDescription) -> ProtocolResult<SessionDescription> {
        Ok(SessionDescription { sdp_type: "answer".into(), sdp: "v=0 fake-answer".into() })
    }
    async fn set_remote_description(&mut self, _remote: SessionDescription) -> ProtocolResult<()> {
        Ok(())
    }
    async fn add_ice_candidate(&mut self, _candidate: IceCandidate) -> ProtocolResult<()> {
        Ok(())
    }
    fn on_ice_candidate(&mut self, _callback: Box<dyn FnMut(Option<IceCandidate>) + Send>) {}
    fn on_connection_state_change(&mut self, _callback: Box<dyn FnMut(ConnectionState) + Send>) {}
    fn connection_kind(&self) -> Option<ConnectionKind> {
        None
    }
    async fn close(&mut self) {}
}

/// `FrameSink` over the sending half of a real WebSocket, the same role
/// `latch-net`'s `SignalingWriter` plays against the real client transport.
struct WsSink {
    sink: SplitSink<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, Message>,
}

impl FrameSink for WsSink {
    async fn send_frame(&mut self, text: String) -> ProtocolResult<()> {
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ProtocolError::Transport(e.to_string()))
    }
}

impl WsSink {
    async fn close_with_code(&mut self, code: u16) {
        let _ = self
            .sink
            .send(Message::Close(Some(CloseFrame { code: code.into(), reason: "".into() })))
            .await;
    }
}

#[tokio::test]
async fn happy_path_shared_session_key_via_real_sockets() {
    let addr = spawn_relay(RelayConfig::default()).await;

    let mut a = connect_with_protocol(&ws_url(addr, "/"), SUBPROTOCOL)
        .await
        .unwrap();

    let init_text = match a.next().await.unwrap().unwrap() {
        Message::Text(t) => t,
        other => panic!("expected init frame, got {other:?}"),
    };
    let init = InitFrame::from_json(init_text.as_str()).unwrap();
    let slot: latch_protocol::slot::SlotId = init.slot.parse().unwrap();

    let mut b = connect_with_protocol(&ws_url(addr, &format!("/{}", init.slot)), SUBPROTOCOL)
        .await
        .unwrap();
    let _b_init = b.next().await.unwrap().unwrap();

    let passphrase = "correct horse battery staple";
    let ctx = slot.0.to_string();
    let ctx = ctx.as_bytes();

    let (msg_b, joiner_state) = JoinerState::start(passphrase, ctx);
    b.send(Message::Text(encode_frame(&msg_b).into()))
        .await
        .unwrap();

    let msg_b_on_a = match a.next().await.unwrap().unwrap() {
        Message::Text(t) => decode_frame(t.as_str()).unwrap(),
        other => panic!("expected PAKE frame, got {other:?}"),
    };
    let (msg_a, master_key_a) = Initiator::exchange(passphrase, ctx, &msg_b_on_a).unwrap();
    a.send(Message::Text(encode_frame(&msg_a).into()))
        .await
        .unwrap();

    let msg_a_on_b = match b.next().await.unwrap().unwrap() {
        Message::Text(t) => decode_frame(t.as_str()).unwrap(),
        other => panic!("expected PAKE frame, got {other:?}"),
    };
    let master_key_b = joiner_state.finish(&msg_a_on_b).unwrap();

    assert_eq!(master_key_a, master_key_b);
    let key_a = kdf::session_key(&master_key_a).unwrap();
    let key_b = kdf::session_key(&master_key_b).unwrap();
    assert_eq!(key_a, key_b);

    let sealed = latch_crypto::seal_frame(&key_a, b"hello from a").unwrap();
    a.send(Message::Text(encode_frame(&sealed).into()))
        .await
        .unwrap();
    let received = match b.next().await.unwrap().unwrap() {
        Message::Text(t) => decode_frame(t.as_str()).unwrap(),
        other => panic!("expected sealed frame, got {other:?}"),
    };
    assert_eq!(latch_crypto::open(&key_b, &received).unwrap(), b"hello from a");
}

#[tokio::test]
async fn wrong_passphrase_yields_distinguishable_auth_failure() {
    let addr = spawn_relay(RelayConfig::default()).await;

    let mut a = connect_with_protocol(&ws_url(addr, "/"), SUBPROTOCOL)
        .await
        .unwrap();
    let init = match a.next().await.unwrap().unwrap() {
        Message::Text(t) => InitFrame::from_json(t.as_str()).unwrap(),
        other => panic!("expected init frame, got {other:?}"),
    };
    let slot: latch_protocol::slot::SlotId = init.slot.parse().unwrap();
    let ctx = slot.0.to_string();

    let mut b = connect_with_protocol(&ws_url(addr, &format!("/{}", init.slot)), SUBPROTOCOL)
        .await
        .unwrap();
    let _ = b.next().await.unwrap().unwrap();

    let (msg_b, joiner_state) = JoinerState::start("alpha", ctx.as_bytes());
    b.send(Message::Text(encode_frame(&msg_b).into()))
        .await
        .unwrap();

    let msg_b_on_a = match a.next().await.unwrap().unwrap() {
        Message::Text(t) => decode_frame(t.as_str()).unwrap(),
        other => panic!("expected PAKE frame, got {other:?}"),
    };
    let (msg_a, master_key_a) = Initiator::exchange("beta", ctx.as_bytes(), &msg_b_on_a).unwrap();
    a.send(Message::Text(encode_frame(&msg_a).into()))
        .await
        .unwrap();

    let msg_a_on_b = match b.next().await.unwrap().unwrap() {
        Message::Text(t) => decode_frame(t.as_str()).unwrap(),
        other => panic!("expected PAKE frame, got {other:?}"),
    };
    let master_key_b = joiner_state.finish(&msg_a_on_b).unwrap();
    assert_ne!(master_key_a, master_key_b);

    let key_a = kdf::session_key(&master_key_a).unwrap();
    let key_b = kdf::session_key(&master_key_b).unwrap();

    let sealed = latch_crypto::seal_frame(&key_a, b"offer from a").unwrap();
    a.send(Message::Text(encode_frame(&sealed).into()))
        .await
        .unwrap();
    let received = match b.next().await.unwrap().unwrap() {
        Message::Text(t) => decode_frame(t.as_str()).unwrap(),
        other => panic!("expected sealed frame, got {other:?}"),
    };
    assert!(latch_crypto::open(&key_b, &received).is_err());
}

#[tokio::test]
async fn joining_nonexistent_slot_closes_with_no_such_slot() {
    let addr = spawn_relay(RelayConfig::default()).await;

    let mut b = connect_with_protocol(&ws_url(addr, "/999999"), SUBPROTOCOL)
        .await
        .unwrap();

    match b.next().await.unwrap().unwrap() {
        Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 4000),
        Message::Close(None) => panic!("expected a close frame with code 4000"),
        other => panic!("expected immediate close, got {other:?}"),
    }
}

#[tokio::test]
async fn subprotocol_mismatch_closes_before_init_frame() {
    let addr = spawn_relay(RelayConfig::default()).await;

    let mut a = connect_with_protocol(&ws_url(addr, "/"), "3").await.unwrap();
    match a.next().await.unwrap().unwrap() {
        Message::Close(Some(frame)) => {
            assert_eq!(u16::from(frame.code), 4003);
        }
        Message::Close(None) => panic!("expected a close frame with code 4003"),
        other => panic!("expected immediate close, got {other:?}"),
    }
}

/// Unlike `wrong_passphrase_yields_distinguishable_auth_failure` above, this
/// drives real `HandshakeDriver`s for both roles instead of hand-rolled PAKE
/// calls, so it actually exercises the bad-key teardown in
/// `latch::commands::session::run_inner`: a failed `open` sends a sealed
/// "bye" and closes with 4005 (spec.md §4.3/§7, Scenario 2), and the other
/// side's close-code handling must surface that as `BadKey`, not a generic
/// transport error.
#[tokio::test]
async fn wrong_passphrase_closes_with_bad_key_through_the_real_driver() {
    let addr = spawn_relay(RelayConfig::default()).await;

    let mut a_ws = connect_with_protocol(&ws_url(addr, "/"), SUBPROTOCOL).await.unwrap();
    let init = match a_ws.next().await.unwrap().unwrap() {
        Message::Text(t) => InitFrame::from_json(t.as_str()).unwrap(),
        other => panic!("expected init frame, got {other:?}"),
    };
    let slot: latch_protocol::slot::SlotId = init.slot.parse().unwrap();

    let mut b_ws = connect_with_protocol(&ws_url(addr, &format!("/{}", init.slot)), SUBPROTOCOL)
        .await
        .unwrap();
    let _ = b_ws.next().await.unwrap().unwrap();

    let (a_sink, mut a_stream) = a_ws.split();
    let (b_sink, mut b_stream) = b_ws.split();

    let (a_tx, a_rx) = mpsc::channel(8);
    let (b_tx, b_rx) = mpsc::channel(8);
    let a_key: Arc<OnceCell<[u8; 32]>> = Arc::new(OnceCell::new());
    let b_key: Arc<OnceCell<[u8; 32]>> = Arc::new(OnceCell::new());

    let a_writer_task = tokio::spawn(run_writer(WsSink { sink: a_sink }, a_rx, a_key.clone()));
    let b_writer_task = tokio::spawn(run_writer(WsSink { sink: b_sink }, b_rx, b_key.clone()));

    let mut a_driver = HandshakeDriver::new(Role::Initiator, FakePeer, a_tx.clone(), a_key.clone());
    let mut b_driver = HandshakeDriver::new(Role::Joiner, FakePeer, b_tx.clone(), b_key.clone());

    a_driver.begin("alpha-passphrase", slot).await.unwrap();
    b_driver.begin("beta-passphrase", slot).await.unwrap();

    // B speaks first; A relays it straight into its driver.
    let msg_b_text = match a_stream.next().await.unwrap().unwrap() {
        Message::Text(t) => t.to_string(),
        other => panic!("expected PAKE frame, got {other:?}"),
    };
    a_driver.on_pake_frame(&msg_b_text, slot).await.unwrap();

    // A's reply establishes its (wrong) session key and immediately queues
    // its sealed offer behind it.
    let msg_a_text = match b_stream.next().await.unwrap().unwrap() {
        Message::Text(t) => t.to_string(),
        other => panic!("expected PAKE frame, got {other:?}"),
    };
    b_driver.on_pake_frame(&msg_a_text, slot).await.unwrap();
    assert_ne!(*a_key.get().unwrap(), *b_key.get().unwrap());

    // A's sealed offer arrives at B under a key the two sides don't share.
    let sealed_offer_text = match b_stream.next().await.unwrap().unwrap() {
        Message::Text(t) => t.to_string(),
        other => panic!("expected sealed frame, got {other:?}"),
    };
    let bytes = decode_frame(&sealed_offer_text).unwrap();
    assert!(latch_crypto::open(b_key.get().unwrap(), &bytes).is_err());

    // Replicate `run_inner`'s bad-key path: sealed bye, then close 4005.
    b_driver.fail_bad_key().await.unwrap();
    drop(b_driver);
    drop(b_tx);
    let mut b_writer = b_writer_task.await.unwrap();
    b_writer.close_with_code(4005).await;

    // A reads whatever text frames the relay forwards (the sealed bye)
    // until it observes the close the relay propagates from B's side.
    let observed_code = loop {
        match a_stream.next().await.unwrap().unwrap() {
            Message::Text(_) => continue,
            Message::Close(Some(frame)) => break u16::from(frame.code),
            Message::Close(None) => panic!("expected a close frame with a code"),
            other => panic!("unexpected frame: {other:?}"),
        }
    };
    assert_eq!(Some(observed_code), ProtocolError::BadKey.close_code());

    drop(a_tx);
    let _ = a_writer_task.await;
}

//! A real `tokio-tungstenite` rendezvous WebSocket client
//!
//! Generalizes the teacher's `todo!()`-stubbed `SignalingClient` into the
//! actual wire client: dial, negotiate the `"4"` subprotocol, read the init
//! frame, then shuttle text frames in both directions.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use latch_protocol::handshake::FrameSink;
use latch_protocol::wire::{InitFrame, SUBPROTOCOL};

use crate::error::NetworkError;
use crate::Result;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// One incoming item off the rendezvous socket, classified just enough for
/// the caller to route it to the right handshake-driver method.
#[derive(Debug)]
pub enum IncomingFrame {
    /// Raw base64url bytes: either a PAKE message (pre-key) or a sealed
    /// frame (post-key) — the caller knows which based on its own state.
    Frame(String),
    /// The remote side (or the relay, translating a peer's close) closed
    /// with this WebSocket close code.
    Closed(Option<u16>),
}

/// A connected rendezvous WebSocket client.
pub struct SignalingClient {
    stream: WsStream,
}

impl SignalingClient {
    /// Dial a new slot: connect to `base_url` (e.g. `ws://relay.example/`)
    /// and return the client along with the init frame the relay sends
    /// immediately on connect.
    pub async fn new_slot(base_url: &str) -> Result<(Self, InitFrame)> {
        Self::dial(base_url).await
    }

    /// Join an existing slot named in the out-of-band passphrase.
    pub async fn join_slot(base_url: &str, slot: &str) -> Result<(Self, InitFrame)> {
        let url = format!("{}/{}", base_url.trim_end_matches('/'), slot);
        Self::dial(&url).await
    }

    async fn dial(url: &str) -> Result<(Self, InitFrame)> {
        let mut request = url
            .into_client_request()
            .map_err(|e| NetworkError::Socket(e.to_string()))?;
        request.headers_mut().insert(
            "sec-websocket-protocol",
            SUBPROTOCOL
                .parse()
                .expect("SUBPROTOCOL is a valid header value"),
        );

        let (mut stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(NetworkError::from)?;

        match stream.next().await {
            Some(Ok(WsMessage::Text(text))) => {
                let init = InitFrame::from_json(text.as_str())?;
                Ok((Self { stream }, init))
            }
            Some(Ok(WsMessage::Close(frame))) => {
                Err(close_frame_to_error(frame.map(|f| f.code.into())))
            }
            Some(Ok(other)) => Err(NetworkError::Socket(format!(
                "expected init frame, got {other:?}"
            ))),
            Some(Err(e)) => Err(NetworkError::from(e)),
            None => Err(NetworkError::Socket("connection closed before init frame".into())),
        }
    }

    /// Read the next item off the socket, skipping ping/pong frames.
    pub async fn next_frame(&mut self) -> Result<IncomingFrame> {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => return Ok(IncomingFrame::Frame(text.to_string())),
                Some(Ok(WsMessage::Close(frame))) => {
                    return Ok(IncomingFrame::Closed(frame.map(|f| f.code.into())))
                }
                Some(Ok(WsMessage::Binary(_))) => {
                    return Err(NetworkError::Socket("binary frame is a protocol error".into()))
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(NetworkError::from(e)),
                None => return Ok(IncomingFrame::Closed(None)),
            }
        }
    }

    /// Close the socket with a specific protocol close code.
    pub async fn close_with_code(&mut self, code: u16) -> Result<()> {
        self.stream
            .send(WsMessage::Close(Some(CloseFrame {
                code: code.into(),
                reason: "".into(),
            })))
            .await
            .map_err(NetworkError::from)
    }

    /// Split into an independent reader and writer, so frames can be read
    /// in one task while the other drives the handshake driver's writer
    /// task over the same socket.
    pub fn split(self) -> (SignalingReader, SignalingWriter) {
        let (sink, stream) = self.stream.split();
        (SignalingReader { stream }, SignalingWriter { sink })
    }
}

/// The read half of a split [`SignalingClient`].
pub struct SignalingReader {
    stream: SplitStream<WsStream>,
}

impl SignalingReader {
    /// Read the next item off the socket, skipping ping/pong frames.
    pub async fn next_frame(&mut self) -> Result<IncomingFrame> {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => return Ok(IncomingFrame::Frame(text.to_string())),
                Some(Ok(WsMessage::Close(frame))) => {
                    return Ok(IncomingFrame::Closed(frame.map(|f| f.code.into())))
                }
                Some(Ok(WsMessage::Binary(_))) => {
                    return Err(NetworkError::Socket("binary frame is a protocol error".into()))
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(NetworkError::from(e)),
                None => return Ok(IncomingFrame::Closed(None)),
            }
        }
    }
}

/// The write half of a split [`SignalingClient`], implementing
/// [`FrameSink`] for the handshake driver's writer task.
pub struct SignalingWriter {
    sink: SplitSink<WsStream, WsMessage>,
}

impl SignalingWriter {
    /// Close the socket with a specific protocol close code.
    pub async fn close_with_code(&mut self, code: u16) -> Result<()> {
        self.sink
            .send(WsMessage::Close(Some(CloseFrame {
                code: code.into(),
                reason: "".into(),
            })))
            .await
            .map_err(NetworkError::from)
    }
}

impl FrameSink for SignalingWriter {
    async fn send_frame(&mut self, text: String) -> latch_protocol::error::Result<()> {
        self.sink
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| latch_protocol::error::ProtocolError::Transport(e.to_string()))
    }
}

/// Map a WebSocket close code observed on the rendezvous socket to the
/// taxonomy error it signifies (spec.md §7), so a caller can tell a
/// wrong-passphrase close (4005 → `BadKey`) from a network drop instead of
/// surfacing a generic message.
pub fn close_frame_to_error(code: Option<u16>) -> NetworkError {
    match code {
        Some(4000) => NetworkError::NoSuchSlot,
        Some(4001) => NetworkError::TimedOut,
        Some(4002) => NetworkError::NoMoreSlots,
        Some(4003) => NetworkError::BadVersion,
        Some(4004) => NetworkError::PeerHungUp,
        Some(4005) => NetworkError::BadKey,
        _ => NetworkError::Socket("rendezvous socket closed".into()),
    }
}

impl FrameSink for SignalingClient {
    async fn send_frame(&mut self, text: String) -> latch_protocol::error::Result<()> {
        self.stream
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| latch_protocol::error::ProtocolError::Transport(e.to_string()))
    }
}

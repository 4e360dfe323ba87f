//! The single rendezvous WebSocket endpoint
//!
//! Generalized from the teacher's `websocket.rs` bridge pattern, but
//! carrying **text** frames end to end (the teacher's 4-byte length prefix
//! was QUIC-bridge framing, not this protocol) and validating the
//! subprotocol tag before any other I/O, as spec.md §4.2/§6 require.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message as WsMsg, Utf8Bytes, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use latch_protocol::slot::SlotId;
use latch_protocol::wire::SUBPROTOCOL;

use crate::auth;
use crate::rate_limit::RateLimiter;
use crate::slot::{SlotError, SlotTable};
use crate::turn;
use crate::{config::RelayConfig, signaling};

/// Shared state for the rendezvous endpoint.
pub struct RelayState {
    /// Every live slot and the free pool of ids.
    pub slots: Arc<SlotTable>,
    /// Static relay configuration (STUN/TURN endpoints, deadlines, secret).
    pub config: RelayConfig,
    /// Per-IP connection rate limiter.
    pub rate_limiter: std::sync::Mutex<RateLimiter>,
}

impl RelayState {
    /// Build fresh relay state from a validated configuration.
    pub fn new(config: RelayConfig) -> Self {
        let slots = Arc::new(SlotTable::new(
            config.max_slots,
            std::time::Duration::from_secs(config.slot_idle_secs),
            std::time::Duration::from_secs(config.handshake_deadline_secs),
        ));
        let rate_limiter = std::sync::Mutex::new(RateLimiter::new(config.rate_limit));
        Self { slots, config, rate_limiter }
    }
}

/// Build the axum router for the rendezvous endpoint.
///
/// Routes:
/// - `GET /` - allocate a new slot
/// - `GET /:slot` - join an existing slot
/// - `GET /health` - liveness check
pub fn router(state: Arc<RelayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(new_slot_handler))
        .route("/{slot}", get(join_slot_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

fn subprotocol_ok(headers: &HeaderMap) -> bool {
    headers
        .get("sec-websocket-protocol")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').map(str::trim).any(|p| p == SUBPROTOCOL))
        .unwrap_or(false)
}

fn close_only(code: u16) -> impl FnOnce(axum::extract::ws::WebSocket) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
    move |socket| {
        Box::pin(async move {
            use futures::SinkExt;
            let (mut sink, _) = futures::StreamExt::split(socket);
            let _ = sink
                .send(WsMsg::Close(Some(CloseFrame {
                    code,
                    reason: Utf8Bytes::from_static(""),
                })))
                .await;
        })
    }
}

async fn new_slot_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<RelayState>>,
) -> impl IntoResponse {
    if !rate_limit_ok(&state, addr) {
        return ws
            .protocols([SUBPROTOCOL])
            .on_upgrade(close_only(4002));
    }

    if !subprotocol_ok(&headers) {
        tracing::info!(peer = %addr, "subprotocol mismatch on new slot");
        return ws.on_upgrade(close_only(4003));
    }

    if !auth::verify_relay_secret(&state.config.relay_secret, relay_secret_header(&headers)) {
        return ws.protocols([SUBPROTOCOL]).on_upgrade(close_only(4003));
    }

    match state.slots.create() {
        Ok((slot_id, rx)) => {
            let ice_servers = turn::build_ice_servers(&state.config);
            let handshake_deadline =
                std::time::Duration::from_secs(state.config.handshake_deadline_secs);
            let slots = Arc::clone(&state.slots);
            ws.protocols([SUBPROTOCOL]).on_upgrade(move |socket| async move {
                signaling::run_session(socket, slots, slot_id, true, rx, ice_servers, handshake_deadline)
                    .await;
            })
        }
        Err(SlotError::NoMoreSlots) => {
            tracing::warn!("slot pool exhausted");
            ws.protocols([SUBPROTOCOL]).on_upgrade(close_only(4002))
        }
        Err(_) => ws.protocols([SUBPROTOCOL]).on_upgrade(close_only(4002)),
    }
}

async fn join_slot_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(slot_str): Path<String>,
    State(state): State<Arc<RelayState>>,
) -> impl IntoResponse {
    if !rate_limit_ok(&state, addr) {
        return ws.protocols([SUBPROTOCOL]).on_upgrade(close_only(4002));
    }

    if !subprotocol_ok(&headers) {
        tracing::info!(peer = %addr, "subprotocol mismatch on join slot");
        return ws.on_upgrade(close_only(4003));
    }

    if !auth::verify_relay_secret(&state.config.relay_secret, relay_secret_header(&headers)) {
        return ws.protocols([SUBPROTOCOL]).on_upgrade(close_only(4003));
    }

    let slot_id: SlotId = match slot_str.parse() {
        Ok(id) => id,
        Err(_) => return ws.protocols([SUBPROTOCOL]).on_upgrade(close_only(4000)),
    };

    match state.slots.join(slot_id) {
        Ok(rx) => {
            let ice_servers = turn::build_ice_servers(&state.config);
            let handshake_deadline =
                std::time::Duration::from_secs(state.config.handshake_deadline_secs);
            let slots = Arc::clone(&state.slots);
            ws.protocols([SUBPROTOCOL]).on_upgrade(move |socket| async move {
                signaling::run_session(socket, slots, slot_id, false, rx, ice_servers, handshake_deadline)
                    .await;
            })
        }
        Err(SlotError::NoSuchSlot) => {
            tracing::info!(slot = %slot_id, "join targeted a nonexistent or closed slot");
            ws.protocols([SUBPROTOCOL]).on_upgrade(close_only(4000))
        }
        Err(SlotError::SlotFull) => {
            tracing::info!(slot = %slot_id, "join targeted an already-paired slot");
            ws.protocols([SUBPROTOCOL]).on_upgrade(close_only(4000))
        }
        Err(SlotError::NoMoreSlots) => ws.protocols([SUBPROTOCOL]).on_upgrade(close_only(4002)),
    }
}

fn relay_secret_header(headers: &HeaderMap) -> Option<&str> {
    headers.get("x-latch-relay-secret").and_then(|v| v.to_str().ok())
}

fn rate_limit_ok(state: &RelayState, addr: SocketAddr) -> bool {
    state.rate_limiter.lock().unwrap().check(addr.ip())
}

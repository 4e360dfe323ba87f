//! latch-relay: the self-hosted slot rendezvous server
//!
//! Reference binary for `latch_relay`; the core is the library crate, this
//! is just CLI parsing, config loading, logging setup, and the serve loop
//! (all explicitly out of the core's scope per spec.md §1).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use latch_relay::{config::RelayConfig, router, RelayState};

/// Run the latch rendezvous relay.
#[derive(Parser)]
#[command(name = "latch-relay", about = "latch slot rendezvous relay", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. CLI flags override its values.
    #[arg(long)]
    config: Option<String>,

    /// HTTP/WebSocket bind address.
    #[arg(long, env = "LATCH_RELAY_BIND")]
    bind_addr: Option<String>,

    /// STUN server URL handed to peers (e.g. stun:stun.l.google.com:19302).
    #[arg(long, env = "LATCH_RELAY_STUN")]
    stun_endpoint: Option<String>,

    /// TURN server URL for relayed connectivity.
    #[arg(long, env = "LATCH_RELAY_TURN")]
    turn_endpoint: Option<String>,

    /// Shared secret used to mint short-lived TURN REST-API credentials.
    #[arg(long, env = "LATCH_RELAY_TURN_SECRET")]
    turn_secret: Option<String>,

    /// Relay-wide shared secret gating slot creation. Empty means open.
    #[arg(long, env = "LATCH_RELAY_SECRET")]
    relay_secret: Option<String>,
}

fn load_config(cli: &Cli) -> RelayConfig {
    let mut config = match &cli.config {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(contents) => RelayConfig::from_toml_str(&contents).unwrap_or_else(|e| {
                eprintln!("failed to parse {path}: {e}, falling back to defaults");
                RelayConfig::default()
            }),
            Err(e) => {
                eprintln!("failed to read {path}: {e}, falling back to defaults");
                RelayConfig::default()
            }
        },
        None => RelayConfig::default(),
    };

    if let Some(addr) = &cli.bind_addr {
        config.bind_addr = addr.clone();
    }
    if let Some(stun) = &cli.stun_endpoint {
        config.stun_endpoint = stun.clone();
    }
    if let Some(turn) = &cli.turn_endpoint {
        config.turn_endpoint = turn.clone();
    }
    if let Some(secret) = &cli.turn_secret {
        config.turn_secret = secret.clone();
    }
    if let Some(secret) = &cli.relay_secret {
        config.relay_secret = secret.clone();
    }

    config.validate();
    config
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli);
    let bind_addr: SocketAddr = config
        .bind_addr
        .parse()
        .expect("RelayConfig::validate guarantees a parseable bind_addr");

    tracing::info!(
        addr = %bind_addr,
        max_slots = config.max_slots,
        handshake_deadline_secs = config.handshake_deadline_secs,
        "starting latch relay"
    );

    let state = Arc::new(RelayState::new(config));

    let cleanup_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(10));
        loop {
            ticker.tick().await;
            let removed = cleanup_state.slots.cleanup_stale();
            if removed > 0 {
                tracing::debug!(removed, "swept stale slots");
            }
        }
    });

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .expect("failed to bind relay listener");
    axum::serve(listener, app)
        .await
        .expect("relay server terminated unexpectedly");
}

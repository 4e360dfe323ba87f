//! CLI argument parsing

use clap::{Args, Parser, Subcommand};

/// Default rendezvous relay, matching `latch-relay`'s default bind address
/// scheme (ws, not wss — TLS termination is expected to sit in front in a
/// real deployment).
pub const DEFAULT_RELAY: &str = "ws://127.0.0.1:8080";

#[derive(Parser)]
#[command(name = "latch")]
#[command(author, version, about = "PAKE-secured WebRTC rendezvous handshake", long_about = None)]
pub struct Cli {
    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (machine-readable)
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new slot and wait for a peer to join with the passphrase
    New(NewArgs),

    /// Join a slot using a passphrase read out of band
    Join(JoinArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),

    /// Show version and build info
    Version,
}

#[derive(Args)]
pub struct NewArgs {
    /// Number of random passphrase words beyond the slot encoding (reserved
    /// for future wordlist sizes; the current 256-word list always emits
    /// one word per byte)
    #[arg(long, hide = true)]
    pub words: Option<usize>,

    /// Rendezvous relay address (also reads LATCH_RELAY env var)
    #[arg(long, default_value = DEFAULT_RELAY, env = "LATCH_RELAY")]
    pub relay: String,

    /// Display the post-handshake verification string (numeric + emoji)
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args)]
pub struct JoinArgs {
    /// Passphrase printed by `latch new` (also reads LATCH_CODE env var)
    #[arg(env = "LATCH_CODE")]
    pub code: String,

    /// Rendezvous relay address (also reads LATCH_RELAY env var)
    #[arg(long, default_value = DEFAULT_RELAY, env = "LATCH_RELAY")]
    pub relay: String,

    /// Display the post-handshake verification string (numeric + emoji)
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell type
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

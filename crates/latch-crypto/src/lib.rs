//! # latch-crypto
//!
//! Cryptographic primitives for the latch peer rendezvous handshake:
//! CPace PAKE over Ristretto255, HKDF-SHA256 session key derivation, and
//! an XSalsa20Poly1305 sealed-frame AEAD for the SDP/candidate messages
//! exchanged once a session key exists.
//!
//! ## Features
//!
//! - **Memory Safety**: automatic zeroization of scalars and session keys
//! - **Domain Separation**: distinct BLAKE3 contexts per use
//! - **No identity**: the only secret is the shared passphrase

#![warn(missing_docs)]
// `mem::wipe` needs `unsafe` for `setrlimit`/`mlock`/`munlock`; everything
// else in this crate is safe Rust.
#![deny(unsafe_code)]

pub mod error;
pub mod hash;
pub mod kdf;
pub mod mem;
pub mod pake;
pub mod symmetric;

// Re-export commonly used types
pub use error::{CryptoError, Result};
pub use hash::{blake3, domain};
pub use pake::{Initiator, JoinerState};
pub use symmetric::{open, seal_frame};

/// Library version constant
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the cryptography library (e.g., prevent core dumps, lock memory)
///
/// This should be called once at application startup for maximum security.
pub fn init() -> Result<()> {
    mem::wipe::prevent_core_dumps()?;
    Ok(())
}

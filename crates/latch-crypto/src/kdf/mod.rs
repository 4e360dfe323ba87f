//! Key derivation functions
//!
//! HKDF-SHA256 is the only KDF this crate needs: deriving the session key
//! from a PAKE master key.

pub mod hkdf;

pub use self::hkdf::derive;

use crate::error::Result;

/// Derive the 32-byte session key from a PAKE master key.
///
/// Uses HKDF-SHA256 with an empty salt and empty info string, per the
/// handshake's key schedule.
pub fn session_key(master_key: &[u8]) -> Result<[u8; 32]> {
    let okm = derive(b"", master_key, b"", 32)?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&okm);
    Ok(key)
}

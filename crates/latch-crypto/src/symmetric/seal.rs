//! Sealed-frame authenticated encryption
//!
//! A "sealed frame" is a random 24-byte nonce prepended to an
//! XSalsa20Poly1305 ciphertext, the same shape as NaCl's `crypto_secretbox`.
//! The 24-byte nonce is large enough to pick uniformly at random per
//! message rather than track a counter, which keeps the handshake driver
//! free of any sequencing state.

use crate::error::{CryptoError, Result};
use rand::RngCore;
use xsalsa20poly1305::{
    aead::{Aead, KeyInit, Payload},
    Nonce, XSalsa20Poly1305,
};

/// Length in bytes of the random nonce prefix on a sealed frame.
pub const NONCE_LEN: usize = 24;

/// Seal `plaintext` under `key`, returning `nonce || ciphertext`.
///
/// A fresh nonce is drawn from the OS RNG for every call.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let cipher = XSalsa20Poly1305::new(key.into());
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad: &[] })
        .map_err(|e| CryptoError::Encryption(format!("seal failed: {e}")))?;

    let mut frame = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    frame.extend_from_slice(&nonce_bytes);
    frame.extend_from_slice(&ciphertext);
    Ok(frame)
}

/// Open a sealed frame produced by [`seal`], returning the plaintext.
///
/// Any authentication failure — wrong key, truncated frame, or a
/// tampered ciphertext — is reported as [`CryptoError::Decryption`],
/// which the handshake driver treats as evidence of a mismatched
/// passphrase.
pub fn open(key: &[u8; 32], frame: &[u8]) -> Result<Vec<u8>> {
    if frame.len() < NONCE_LEN {
        return Err(CryptoError::Decryption("frame shorter than nonce".into()));
    }
    let (nonce_bytes, ciphertext) = frame.split_at(NONCE_LEN);

    let cipher = XSalsa20Poly1305::new(key.into());
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad: &[] })
        .map_err(|_| CryptoError::Decryption("authentication failed".into()))
}

//! CPace PAKE (Password-Authenticated Key Exchange) over Ristretto255
//!
//! Implements CPace in its asymmetric rendezvous shape: the joiner (the
//! peer that holds a slot number already) speaks first, the initiator
//! replies with both its own public message and the derived master key
//! in a single call, and the joiner finishes alone. The code phrase is
//! hashed to a group generator, so a passive relay that records every
//! message learns nothing usable for an offline dictionary attack.

use crate::error::{CryptoError, Result};
use crate::hash::{blake3, domain::DOMAIN_PAKE};
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand_core::OsRng;
use zeroize::Zeroize;

/// Derive the CPace generator from a code phrase and channel-binding context.
///
/// `context` is the slot id: binding it here means a relay cannot splice
/// a PAKE message from one slot into another slot sharing the same
/// passphrase.
fn derive_generator(code_phrase: &str, context: &[u8]) -> RistrettoPoint {
    let mut input = Vec::new();
    input.extend_from_slice(DOMAIN_PAKE.as_bytes());
    input.push(0x00);
    input.extend_from_slice(code_phrase.as_bytes());
    input.push(0x00);
    input.extend_from_slice(context);

    let h1 = blake3::hash(&input);
    input.push(0x01);
    let h2 = blake3::hash(&input);

    let mut wide = [0u8; 64];
    wide[..32].copy_from_slice(&h1);
    wide[32..].copy_from_slice(&h2);

    RistrettoPoint::from_uniform_bytes(&wide)
}

fn decompress(bytes: &[u8]) -> Result<RistrettoPoint> {
    if bytes.len() != 32 {
        return Err(CryptoError::InvalidKey(
            "CPace public message must be 32 bytes".to_string(),
        ));
    }
    let arr: [u8; 32] = bytes.try_into().unwrap();
    CompressedRistretto(arr)
        .decompress()
        .ok_or_else(|| CryptoError::PakeFailure("invalid Ristretto point from peer".to_string()))
}

fn transcript(joiner_msg: &[u8], initiator_msg: &[u8], shared: &[u8]) -> [u8; 32] {
    let mut t = Vec::with_capacity(DOMAIN_PAKE.len() + 32 + 32 + 32);
    t.extend_from_slice(DOMAIN_PAKE.as_bytes());
    t.extend_from_slice(joiner_msg);
    t.extend_from_slice(initiator_msg);
    t.extend_from_slice(shared);
    blake3::derive_key("cpace-master-key", &t)
}

/// The joiner's private state between `start` and `finish`.
pub struct JoinerState {
    scalar: Scalar,
    public: CompressedRistretto,
}

impl Drop for JoinerState {
    fn drop(&mut self) {
        self.scalar.zeroize();
    }
}

impl JoinerState {
    /// Start the joiner side of CPace: derive the generator, pick an
    /// ephemeral scalar, and produce the message to send to the initiator.
    pub fn start(code_phrase: &str, context: &[u8]) -> (Vec<u8>, JoinerState) {
        let generator = derive_generator(code_phrase, context);
        let scalar = Scalar::random(&mut OsRng);
        let public = (scalar * generator).compress();
        (public.to_bytes().to_vec(), JoinerState { scalar, public })
    }

    /// Complete the exchange with the initiator's reply, producing the
    /// shared master key.
    pub fn finish(self, initiator_msg: &[u8]) -> Result<[u8; 32]> {
        let their_point = decompress(initiator_msg)?;
        let shared = (self.scalar * their_point).compress().to_bytes();
        Ok(transcript(&self.public.to_bytes(), initiator_msg, &shared))
    }
}

/// Stateless initiator side: the initiator never needs to hold state
/// between steps, since one call produces both its reply and the key.
pub struct Initiator;

impl Initiator {
    /// Respond to the joiner's message, returning the reply to send back
    /// and the derived master key.
    pub fn exchange(
        code_phrase: &str,
        context: &[u8],
        joiner_msg: &[u8],
    ) -> Result<(Vec<u8>, [u8; 32])> {
        let generator = derive_generator(code_phrase, context);
        let their_point = decompress(joiner_msg)?;

        let scalar = Scalar::random(&mut OsRng);
        let public = (scalar * generator).compress();
        let shared = (scalar * their_point).compress().to_bytes();

        let master_key = transcript(joiner_msg, &public.to_bytes(), &shared);
        Ok((public.to_bytes().to_vec(), master_key))
    }
}

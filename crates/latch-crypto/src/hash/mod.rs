//! Cryptographic hash functions and utilities
//!
//! BLAKE3 plus the domain separation constants used to bind the CPace
//! generator to this protocol.

pub mod blake3;
pub mod domain;

pub use self::blake3::{derive_key, hash, keyed_hash};
pub use domain::*;

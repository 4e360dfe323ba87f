//! Domain separation constants for cryptographic operations
//!
//! These constants ensure that cryptographic operations in different contexts
//! produce different outputs, even with the same inputs.

/// Domain separator for the CPace group generator derivation
pub const DOMAIN_PAKE: &str = "latch.pake.cpace.v1";

/// Domain separator for key derivation functions
pub const DOMAIN_KDF: &str = "latch.kdf.v1";

/// Domain separator for sealed-frame nonce/key material, if ever derived
/// rather than sampled
pub const DOMAIN_NONCE: &str = "latch.nonce.v1";

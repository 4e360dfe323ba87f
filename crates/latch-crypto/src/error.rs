//! Error types for cryptographic operations

use thiserror::Error;

/// Result type alias using CryptoError
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// PAKE protocol failure (bad group element, malformed peer message)
    #[error("PAKE protocol failed: {0}")]
    PakeFailure(String),

    /// Invalid key material
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Error during encryption
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Error during decryption or AEAD authentication
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Error during key derivation
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// I/O error during a cryptographic operation (e.g. mlock, core dump guard)
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for CryptoError {
    fn from(e: std::io::Error) -> Self {
        CryptoError::Io(e.to_string())
    }
}

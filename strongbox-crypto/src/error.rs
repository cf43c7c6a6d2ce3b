//! Error types for the cryptographic capability layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors raised by a [`CryptoProvider`](crate::CryptoProvider) or by the
/// key and certificate helpers in this crate.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("signature error: {0}")]
    Signature(String),

    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! Identity error types.

use strongbox_crypto::{CertificateStatus, CryptoError};
use thiserror::Error;

/// Result type for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Errors raised by registration, login and certificate gating.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("user already registered: {0}")]
    AlreadyRegistered(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("certificate not found: {0}")]
    CertificateNotFound(String),

    /// Every candidate in the pool was taken, bound to another subject, or
    /// failed validation. `skipped` lists the candidates that failed.
    #[error("no valid certificate available for {username}")]
    NoValidCertificate {
        username: String,
        skipped: Vec<(String, CertificateStatus)>,
    },

    #[error("certificate is {0}")]
    Certificate(CertificateStatus),

    #[error("key material does not match the registered identity of {0}")]
    KeyMismatch(String),

    #[error("password attempts exhausted after {attempts} tries")]
    PasswordExhausted { attempts: u32 },

    #[error("invalid username: {0:?}")]
    InvalidUsername(String),

    #[error("trust anchor not installed: {0}")]
    TrustAnchorMissing(String),

    #[error("unsupported registry version {0}")]
    UnsupportedVersion(u32),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

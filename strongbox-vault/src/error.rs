//! Vault error types.

use strongbox_crypto::CryptoError;
use strongbox_identity::IdentityError;
use thiserror::Error;

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Failures surfaced at the vault operation boundary.
///
/// A digest mismatch on an owned object is not an error; it is reported on
/// the [`DownloadReport`](crate::DownloadReport).
#[derive(Debug, Error)]
pub enum VaultError {
    /// Path escapes the vault root, destination is inside a vault tree, or
    /// an envelope is malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("crypto provider error: {0}")]
    CryptoProvider(#[from] CryptoError),

    /// Shared download whose signature or sender identity did not check out.
    #[error("trust check failed: {0}")]
    Trust(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<IdentityError> for VaultError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::AlreadyRegistered(_) | IdentityError::InvalidUsername(_) => {
                Self::Validation(e.to_string())
            }
            IdentityError::UserNotFound(_) | IdentityError::CertificateNotFound(_) => {
                Self::NotFound(e.to_string())
            }
            IdentityError::NoValidCertificate { .. }
            | IdentityError::Certificate(_)
            | IdentityError::KeyMismatch(_)
            | IdentityError::PasswordExhausted { .. }
            | IdentityError::TrustAnchorMissing(_) => Self::Auth(e.to_string()),
            IdentityError::Crypto(inner) => Self::CryptoProvider(inner),
            IdentityError::Serialization(inner) => Self::Serialization(inner),
            IdentityError::UnsupportedVersion(_) | IdentityError::Storage(_) => {
                Self::Io(std::io::Error::other(e.to_string()))
            }
        }
    }
}

/// Maps a missing file to [`VaultError::NotFound`] naming `what`.
pub(crate) fn io_not_found(e: std::io::Error, what: impl std::fmt::Display) -> VaultError {
    if e.kind() == std::io::ErrorKind::NotFound {
        VaultError::NotFound(what.to_string())
    } else {
        VaultError::Io(e)
    }
}

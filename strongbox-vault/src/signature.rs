//! Detached signatures for shared objects.
//!
//! Always Ed25519 over the plaintext. The scheme is fixed so verification
//! needs nothing beyond the blob and the sender's verifying key.

use crate::error::VaultResult;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::sync::Arc;
use strongbox_crypto::{CryptoProvider, SigningKey, VerifyingKey};

/// Base64 signature text as stored in a `.sgn` sidecar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureBlob(String);

impl SignatureBlob {
    pub fn from_encoded(text: impl Into<String>) -> Self {
        Self(text.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub struct SignatureService {
    provider: Arc<dyn CryptoProvider>,
}

impl SignatureService {
    pub fn new(provider: Arc<dyn CryptoProvider>) -> Self {
        Self { provider }
    }

    pub fn sign(&self, plaintext: &[u8], key: &SigningKey) -> VaultResult<SignatureBlob> {
        let signature = self.provider.sign(key, plaintext)?;
        Ok(SignatureBlob(STANDARD.encode(signature)))
    }

    /// `false` for any failure, including a blob that does not decode.
    pub fn verify(&self, plaintext: &[u8], blob: &SignatureBlob, key: &VerifyingKey) -> bool {
        let Ok(bytes) = STANDARD.decode(blob.as_str()) else {
            return false;
        };
        self.provider.verify(key, plaintext, &bytes).unwrap_or(false)
    }
}

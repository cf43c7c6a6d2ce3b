//! Per-object hybrid encryption.
//!
//! Each object gets its own symmetric scheme, digest scheme, key and IV. The
//! body is encrypted symmetrically; the scheme name, key and IV (plus the
//! sender on shared objects) are sealed individually for the recipient and
//! carried in the [`MetadataRecord`].

use crate::error::{VaultError, VaultResult};
use crate::metadata::{DigestLine, MetadataRecord, WrappedFields};
use std::sync::{Arc, Mutex};
use strongbox_crypto::{
    CryptoProvider, DigestScheme, IV_SIZE, PublicKey, SchemeSelector, SecretKey, SymmetricScheme,
};
use tracing::debug;
use zeroize::Zeroizing;

/// Result of comparing the recorded digest with the recovered plaintext.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Integrity {
    Verified,
    /// Hex digests of what the envelope claims and what was recovered.
    Mismatch { expected: String, actual: String },
}

impl Integrity {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

pub struct SealedObject {
    pub ciphertext: Vec<u8>,
    pub metadata: MetadataRecord,
    pub symmetric: SymmetricScheme,
}

pub struct OpenedObject {
    pub plaintext: Vec<u8>,
    pub integrity: Integrity,
    /// Identity recorded by the sender of a shared object.
    pub sender: Option<String>,
}

pub struct HybridCipher {
    provider: Arc<dyn CryptoProvider>,
    selector: Mutex<Box<dyn SchemeSelector>>,
}

impl HybridCipher {
    pub fn new(provider: Arc<dyn CryptoProvider>, selector: Box<dyn SchemeSelector>) -> Self {
        Self {
            provider,
            selector: Mutex::new(selector),
        }
    }

    fn choose_schemes(&self) -> (SymmetricScheme, DigestScheme) {
        let mut selector = self
            .selector
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (selector.symmetric(), selector.digest())
    }

    /// Encrypts `plaintext` for `recipient`. With `sender` set, the sender's
    /// identity is sealed into the envelope as well.
    pub fn seal_for_recipient(
        &self,
        plaintext: &[u8],
        recipient: &PublicKey,
        sender: Option<&str>,
    ) -> VaultResult<SealedObject> {
        let (symmetric, digest_scheme) = self.choose_schemes();
        let p = &self.provider;

        let key = Zeroizing::new(p.random_bytes(symmetric.key_len())?);
        let iv = p.random_bytes(IV_SIZE)?;
        let digest = p.digest(digest_scheme, plaintext)?;
        let ciphertext = p.symmetric_encrypt(symmetric, &key, &iv, plaintext)?;

        let wrapped = WrappedFields {
            algorithm: p.asymmetric_encrypt(recipient, symmetric.name().as_bytes())?,
            iv: p.asymmetric_encrypt(recipient, &iv)?,
            key: p.asymmetric_encrypt(recipient, &key)?,
            sender: sender
                .map(|s| p.asymmetric_encrypt(recipient, s.as_bytes()))
                .transpose()?,
        };
        debug!(
            "sealed {} bytes with {symmetric} / {digest_scheme}",
            plaintext.len()
        );

        Ok(SealedObject {
            ciphertext,
            metadata: MetadataRecord {
                digest: DigestLine {
                    algorithm: digest_scheme,
                    value: digest,
                },
                wrapped,
            },
            symmetric,
        })
    }

    /// Unwraps the envelope with `secret`, decrypts and checks the digest.
    ///
    /// A digest mismatch is reported in [`OpenedObject::integrity`]; the
    /// recovered bytes are returned regardless.
    pub fn open_with_key(
        &self,
        ciphertext: &[u8],
        metadata: &MetadataRecord,
        secret: &SecretKey,
    ) -> VaultResult<OpenedObject> {
        let p = &self.provider;
        let wrapped = &metadata.wrapped;

        let scheme_name = p.asymmetric_decrypt(secret, &wrapped.algorithm)?;
        let symmetric: SymmetricScheme = std::str::from_utf8(&scheme_name)
            .map_err(|_| VaultError::Validation("wrapped scheme name is not UTF-8".into()))?
            .parse()?;
        let key = Zeroizing::new(p.asymmetric_decrypt(secret, &wrapped.key)?);
        let iv = p.asymmetric_decrypt(secret, &wrapped.iv)?;
        let sender = match &wrapped.sender {
            Some(sealed) => Some(
                String::from_utf8(p.asymmetric_decrypt(secret, sealed)?).map_err(|_| {
                    VaultError::Validation("wrapped sender is not UTF-8".into())
                })?,
            ),
            None => None,
        };

        let plaintext = p.symmetric_decrypt(symmetric, &key, &iv, ciphertext)?;
        let actual = p.digest(metadata.digest.algorithm, &plaintext)?;
        let integrity = if actual == metadata.digest.value {
            Integrity::Verified
        } else {
            Integrity::Mismatch {
                expected: hex::encode(&metadata.digest.value),
                actual: hex::encode(&actual),
            }
        };

        Ok(OpenedObject {
            plaintext,
            integrity,
            sender,
        })
    }
}

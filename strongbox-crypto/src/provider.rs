//! The cryptographic capability interface and its in-process implementation.
//!
//! Everything above this crate performs primitives through
//! [`CryptoProvider`] only. Each call is synchronous and may fail; failures
//! surface as [`CryptoError`] values so callers can tell a broken primitive
//! apart from a policy rejection.

use crate::certificate::{
    Certificate, CertificateStatus, RevocationList, TrustAnchor, decode_signature,
};
use crate::envelope::{SealedEnvelope, open_field, seal_field};
use crate::error::{CryptoError, CryptoResult};
use crate::scheme::{DigestScheme, SymmetricScheme};
use chrono::{DateTime, Utc};
use crypto_box::{PublicKey, SecretKey};
use ctr::cipher::{KeyIvInit, StreamCipher};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256, Sha512};
use tracing::debug;

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;
type Aes192Ctr = ctr::Ctr128BE<aes::Aes192>;
type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

/// Cryptographic primitives consumed by the identity and vault layers.
pub trait CryptoProvider: Send + Sync {
    /// Fresh random bytes for keys and IVs.
    fn random_bytes(&self, len: usize) -> CryptoResult<Vec<u8>>;

    fn symmetric_encrypt(
        &self,
        scheme: SymmetricScheme,
        key: &[u8],
        iv: &[u8],
        plaintext: &[u8],
    ) -> CryptoResult<Vec<u8>>;

    fn symmetric_decrypt(
        &self,
        scheme: SymmetricScheme,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
    ) -> CryptoResult<Vec<u8>>;

    /// Wraps `plaintext` so only the holder of `recipient`'s secret can read it.
    fn asymmetric_encrypt(&self, recipient: &PublicKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>>;

    fn asymmetric_decrypt(&self, secret: &SecretKey, ciphertext: &[u8]) -> CryptoResult<Vec<u8>>;

    fn digest(&self, scheme: DigestScheme, data: &[u8]) -> CryptoResult<Vec<u8>>;

    fn sign(&self, key: &SigningKey, data: &[u8]) -> CryptoResult<Vec<u8>>;

    /// `Ok(false)` for a well-formed signature that does not verify.
    fn verify(&self, key: &VerifyingKey, data: &[u8], signature: &[u8]) -> CryptoResult<bool>;

    /// Validates `certificate` against the trust anchor and revocation list
    /// as of `at`.
    fn validate_certificate(
        &self,
        certificate: &Certificate,
        anchor: &TrustAnchor,
        revocations: Option<&RevocationList>,
        at: DateTime<Utc>,
    ) -> CryptoResult<CertificateStatus>;
}

/// [`CryptoProvider`] backed by RustCrypto / dalek implementations.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftwareProvider;

impl SoftwareProvider {
    pub fn new() -> Self {
        Self
    }

    fn apply_keystream(
        scheme: SymmetricScheme,
        key: &[u8],
        iv: &[u8],
        data: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        if key.len() != scheme.key_len() {
            return Err(CryptoError::InvalidKeyLength {
                expected: scheme.key_len(),
                actual: key.len(),
            });
        }
        if iv.len() != scheme.iv_len() {
            return Err(CryptoError::Malformed(format!(
                "iv length {} for {scheme}",
                iv.len()
            )));
        }

        let mut buf = data.to_vec();
        let invalid =
            |e: ctr::cipher::InvalidLength| CryptoError::Malformed(format!("{scheme}: {e}"));
        match scheme {
            SymmetricScheme::Aes128 => Aes128Ctr::new_from_slices(key, iv)
                .map_err(invalid)?
                .apply_keystream(&mut buf),
            SymmetricScheme::Aes192 => Aes192Ctr::new_from_slices(key, iv)
                .map_err(invalid)?
                .apply_keystream(&mut buf),
            SymmetricScheme::Aes256 => Aes256Ctr::new_from_slices(key, iv)
                .map_err(invalid)?
                .apply_keystream(&mut buf),
        }
        Ok(buf)
    }
}

impl CryptoProvider for SoftwareProvider {
    fn random_bytes(&self, len: usize) -> CryptoResult<Vec<u8>> {
        let mut bytes = vec![0u8; len];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::KeyDerivation(format!("os randomness: {e}")))?;
        Ok(bytes)
    }

    fn symmetric_encrypt(
        &self,
        scheme: SymmetricScheme,
        key: &[u8],
        iv: &[u8],
        plaintext: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        Self::apply_keystream(scheme, key, iv, plaintext)
    }

    fn symmetric_decrypt(
        &self,
        scheme: SymmetricScheme,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        Self::apply_keystream(scheme, key, iv, ciphertext)
    }

    fn asymmetric_encrypt(&self, recipient: &PublicKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(seal_field(plaintext, recipient)?.to_bytes())
    }

    fn asymmetric_decrypt(&self, secret: &SecretKey, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        let envelope = SealedEnvelope::from_bytes(ciphertext)?;
        open_field(&envelope, secret)
    }

    fn digest(&self, scheme: DigestScheme, data: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(match scheme {
            DigestScheme::Sha256 => Sha256::digest(data).to_vec(),
            DigestScheme::Sha512 => Sha512::digest(data).to_vec(),
            DigestScheme::Blake3 => blake3::hash(data).as_bytes().to_vec(),
        })
    }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> CryptoResult<Vec<u8>> {
        Ok(key.sign(data).to_bytes().to_vec())
    }

    fn verify(&self, key: &VerifyingKey, data: &[u8], signature: &[u8]) -> CryptoResult<bool> {
        let signature = ed25519_dalek::Signature::from_slice(signature)
            .map_err(|e| CryptoError::Signature(e.to_string()))?;
        Ok(key.verify_strict(data, &signature).is_ok())
    }

    fn validate_certificate(
        &self,
        certificate: &Certificate,
        anchor: &TrustAnchor,
        revocations: Option<&RevocationList>,
        at: DateTime<Utc>,
    ) -> CryptoResult<CertificateStatus> {
        let anchor_key = anchor.verifying_key()?;

        if certificate.body.issuer != anchor.name {
            debug!(
                "certificate {} issued by {:?}, anchor is {:?}",
                certificate.id(),
                certificate.body.issuer,
                anchor.name
            );
            return Ok(CertificateStatus::UntrustedIssuer);
        }
        let signed = certificate.signed_bytes()?;
        let chain_ok = match decode_signature(&certificate.signature) {
            Ok(signature) => anchor_key.verify_strict(&signed, &signature).is_ok(),
            Err(_) => false,
        };
        if !chain_ok {
            return Ok(CertificateStatus::UntrustedIssuer);
        }

        if !certificate.is_within_validity(at) {
            return Ok(CertificateStatus::Expired);
        }

        if let Some(list) = revocations {
            if list.body.issuer != anchor.name {
                return Err(CryptoError::Signature(format!(
                    "revocation list issued by {:?}, anchor is {:?}",
                    list.body.issuer, anchor.name
                )));
            }
            let signature = decode_signature(&list.signature)?;
            anchor_key
                .verify_strict(&list.signed_bytes()?, &signature)
                .map_err(|_| {
                    CryptoError::Signature("revocation list signature does not verify".into())
                })?;
            if list.is_revoked(certificate.id()) {
                return Ok(CertificateStatus::Revoked);
            }
        }

        Ok(CertificateStatus::Valid)
    }
}

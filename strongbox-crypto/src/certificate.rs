//! Identity certificates, trust anchors and revocation lists.
//!
//! Certificates are JSON documents signed with the issuing authority's
//! Ed25519 key. The signature covers the canonical JSON serialization of the
//! body, so any edit to a stored certificate (subject, validity window, keys)
//! invalidates it.

use crate::error::{CryptoError, CryptoResult};
use crate::keys::PublicIdentity;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Outcome of validating a certificate against a trust anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Valid,
    Expired,
    Revoked,
    UntrustedIssuer,
}

impl CertificateStatus {
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Valid => "valid",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
            Self::UntrustedIssuer => "signed by an untrusted issuer",
        })
    }
}

/// The signed portion of a certificate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateBody {
    /// Pool identifier; also the certificate's file stem.
    pub id: String,
    /// Subject identity. Must equal the username the certificate is bound to.
    pub subject: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// Base64 X25519 public key.
    pub encryption_key: String,
    /// Base64 Ed25519 verifying key.
    pub verifying_key: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub body: CertificateBody,
    /// Base64 Ed25519 signature over the canonical body.
    pub signature: String,
}

impl Certificate {
    /// Signs `body` with the issuer's key.
    pub fn sign(body: CertificateBody, issuer_key: &SigningKey) -> CryptoResult<Self> {
        let bytes = serde_json::to_vec(&body)?;
        let signature = STANDARD.encode(issuer_key.sign(&bytes).to_bytes());
        Ok(Self { body, signature })
    }

    pub fn id(&self) -> &str {
        &self.body.id
    }

    pub fn subject(&self) -> &str {
        &self.body.subject
    }

    pub fn public_identity(&self) -> CryptoResult<PublicIdentity> {
        PublicIdentity::from_encoded(&self.body.encryption_key, &self.body.verifying_key)
    }

    /// Canonical bytes covered by the signature.
    pub fn signed_bytes(&self) -> CryptoResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.body)?)
    }

    pub fn is_within_validity(&self, at: DateTime<Utc>) -> bool {
        self.body.not_before <= at && at < self.body.not_after
    }
}

/// The certificate authority root that every chain is validated against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustAnchor {
    pub name: String,
    /// Base64 Ed25519 verifying key.
    pub verifying_key: String,
}

impl TrustAnchor {
    pub fn new(name: impl Into<String>, key: &VerifyingKey) -> Self {
        Self {
            name: name.into(),
            verifying_key: STANDARD.encode(key.to_bytes()),
        }
    }

    pub fn verifying_key(&self) -> CryptoResult<VerifyingKey> {
        let bytes = STANDARD
            .decode(self.verifying_key.trim())
            .map_err(|e| CryptoError::Malformed(format!("trust anchor key: {e}")))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        VerifyingKey::from_bytes(&bytes)
            .map_err(|e| CryptoError::Malformed(format!("trust anchor key: {e}")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationBody {
    pub issuer: String,
    pub issued_at: DateTime<Utc>,
    /// Revoked certificate ids.
    pub revoked: BTreeSet<String>,
}

/// A signed list of revoked certificate ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationList {
    pub body: RevocationBody,
    pub signature: String,
}

impl RevocationList {
    pub fn sign(body: RevocationBody, issuer_key: &SigningKey) -> CryptoResult<Self> {
        let bytes = serde_json::to_vec(&body)?;
        let signature = STANDARD.encode(issuer_key.sign(&bytes).to_bytes());
        Ok(Self { body, signature })
    }

    pub fn signed_bytes(&self) -> CryptoResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.body)?)
    }

    pub fn is_revoked(&self, certificate_id: &str) -> bool {
        self.body.revoked.contains(certificate_id)
    }
}

/// Decodes a base64 Ed25519 signature.
pub fn decode_signature(encoded: &str) -> CryptoResult<Signature> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| CryptoError::Signature(format!("signature encoding: {e}")))?;
    Signature::from_slice(&bytes).map_err(|e| CryptoError::Signature(e.to_string()))
}

//! Metadata sidecar codec.
//!
//! A `.meta` sidecar has exactly three lines:
//!
//! ```text
//! hash=SHA-256:9f86d081884c7d65...
//! strongbox-envelope v1
//! {"algorithm":"<b64>","iv":"<b64>","key":"<b64>","sender":"<b64>"}
//! ```
//!
//! Line 1 is the cleartext digest of the plaintext. It is an integrity hint,
//! not a MAC. Line 2 versions the envelope. Line 3 holds the wrapped fields,
//! each a sealed ciphertext readable only by the recipient; `sender` appears
//! on shared objects only. Unknown keys are rejected, so a field written
//! under any other spelling never parses.

use crate::error::{VaultError, VaultResult};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use strongbox_crypto::DigestScheme;

pub const ENVELOPE_HEADER: &str = "strongbox-envelope v1";
const DIGEST_PREFIX: &str = "hash=";

/// The cleartext `hash=<ALG>:<hex>` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigestLine {
    pub algorithm: DigestScheme,
    pub value: Vec<u8>,
}

impl DigestLine {
    pub fn encode(&self) -> String {
        format!("{DIGEST_PREFIX}{}:{}", self.algorithm, hex::encode(&self.value))
    }

    pub fn parse(line: &str) -> VaultResult<Self> {
        let rest = line
            .trim()
            .strip_prefix(DIGEST_PREFIX)
            .ok_or_else(|| malformed("digest line must start with hash="))?;
        let (algorithm, value) = rest
            .split_once(':')
            .ok_or_else(|| malformed("digest line must be ALGORITHM:HEX"))?;
        let algorithm: DigestScheme = algorithm
            .parse()
            .map_err(|_| malformed(format!("unknown digest algorithm {algorithm:?}")))?;
        let value = hex::decode(value.trim()).map_err(|e| malformed(format!("digest value: {e}")))?;
        if value.len() != algorithm.output_len() {
            return Err(malformed(format!(
                "{algorithm} digest must be {} bytes, got {}",
                algorithm.output_len(),
                value.len()
            )));
        }
        Ok(Self { algorithm, value })
    }
}

/// Sealed ciphertexts of the secret fields, as raw bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrappedFields {
    pub algorithm: Vec<u8>,
    pub iv: Vec<u8>,
    pub key: Vec<u8>,
    pub sender: Option<Vec<u8>>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireFields {
    algorithm: String,
    iv: String,
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sender: Option<String>,
}

impl From<&WrappedFields> for WireFields {
    fn from(fields: &WrappedFields) -> Self {
        Self {
            algorithm: STANDARD.encode(&fields.algorithm),
            iv: STANDARD.encode(&fields.iv),
            key: STANDARD.encode(&fields.key),
            sender: fields.sender.as_ref().map(|s| STANDARD.encode(s)),
        }
    }
}

impl TryFrom<WireFields> for WrappedFields {
    type Error = VaultError;

    fn try_from(wire: WireFields) -> VaultResult<Self> {
        Ok(Self {
            algorithm: decode_field("algorithm", &wire.algorithm)?,
            iv: decode_field("iv", &wire.iv)?,
            key: decode_field("key", &wire.key)?,
            sender: wire
                .sender
                .as_deref()
                .map(|s| decode_field("sender", s))
                .transpose()?,
        })
    }
}

/// Parsed contents of a `.meta` sidecar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataRecord {
    pub digest: DigestLine,
    pub wrapped: WrappedFields,
}

impl MetadataRecord {
    pub fn is_shared(&self) -> bool {
        self.wrapped.sender.is_some()
    }

    pub fn encode(&self) -> VaultResult<String> {
        let fields = serde_json::to_string(&WireFields::from(&self.wrapped))?;
        Ok(format!(
            "{}\n{ENVELOPE_HEADER}\n{fields}\n",
            self.digest.encode()
        ))
    }

    /// Exact inverse of [`MetadataRecord::encode`].
    pub fn parse(text: &str) -> VaultResult<Self> {
        let mut lines = text.lines();
        let digest = DigestLine::parse(lines.next().ok_or_else(|| malformed("empty envelope"))?)?;

        match lines.next().map(str::trim) {
            Some(ENVELOPE_HEADER) => {}
            Some(other) => return Err(malformed(format!("unsupported envelope header {other:?}"))),
            None => return Err(malformed("missing envelope header")),
        }

        let body = lines
            .next()
            .ok_or_else(|| malformed("missing wrapped fields"))?;
        if lines.any(|line| !line.trim().is_empty()) {
            return Err(malformed("unexpected trailing lines"));
        }
        let wire: WireFields = serde_json::from_str(body)
            .map_err(|e| malformed(format!("wrapped fields: {e}")))?;

        Ok(Self {
            digest,
            wrapped: wire.try_into()?,
        })
    }
}

fn decode_field(name: &str, value: &str) -> VaultResult<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| malformed(format!("{name} field: {e}")))
}

fn malformed(msg: impl std::fmt::Display) -> VaultError {
    VaultError::Validation(format!("malformed envelope: {msg}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(sender: bool) -> MetadataRecord {
        MetadataRecord {
            digest: DigestLine {
                algorithm: DigestScheme::Sha256,
                value: vec![0xAB; 32],
            },
            wrapped: WrappedFields {
                algorithm: vec![1, 2, 3],
                iv: vec![4, 5, 6],
                key: vec![7, 8, 9],
                sender: sender.then(|| vec![10, 11]),
            },
        }
    }

    #[test]
    fn owned_envelope_has_no_sender_key() {
        let text = sample(false).encode().unwrap();
        assert!(!text.contains("sender"));
        assert!(text.starts_with("hash=SHA-256:abab"));
        assert_eq!(text.lines().nth(1), Some(ENVELOPE_HEADER));
    }

    #[test]
    fn shared_envelope_roundtrip() {
        let record = sample(true);
        let parsed = MetadataRecord::parse(&record.encode().unwrap()).unwrap();
        assert_eq!(parsed, record);
        assert!(parsed.is_shared());
    }

    #[test]
    fn digest_length_checked() {
        let err = DigestLine::parse("hash=SHA-512:abab").unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));
    }
}

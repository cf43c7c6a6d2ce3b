//! Per-user key material.
//!
//! A user owns two keypairs: an X25519 pair for receiving wrapped fields and
//! an Ed25519 pair for signing shared objects. The public halves travel inside
//! the user's certificate; the private halves live in a key file next to the
//! certificate pool.

use crate::error::{CryptoError, CryptoResult};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use crypto_box::{PublicKey, SecretKey};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

/// Version written into private key files.
pub const KEY_FILE_VERSION: u32 = 1;

/// Public key material bound to one identity.
#[derive(Clone)]
pub struct PublicIdentity {
    pub encryption: PublicKey,
    pub verifying: VerifyingKey,
}

impl PublicIdentity {
    pub fn from_encoded(encryption_b64: &str, verifying_b64: &str) -> CryptoResult<Self> {
        let encryption = decode_array::<32>(encryption_b64, "encryption public key")?;
        let verifying = decode_array::<32>(verifying_b64, "verifying key")?;
        let verifying = VerifyingKey::from_bytes(&verifying)
            .map_err(|e| CryptoError::Malformed(format!("verifying key: {e}")))?;
        Ok(Self {
            encryption: PublicKey::from(*encryption),
            verifying,
        })
    }

    pub fn encryption_b64(&self) -> String {
        STANDARD.encode(self.encryption.as_bytes())
    }

    pub fn verifying_b64(&self) -> String {
        STANDARD.encode(self.verifying.to_bytes())
    }

    /// Hex SHA-256 over both public keys; stable across encodings.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.encryption.as_bytes());
        hasher.update(self.verifying.to_bytes());
        hex::encode(hasher.finalize())
    }
}

impl PartialEq for PublicIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.encryption.as_bytes() == other.encryption.as_bytes()
            && self.verifying == other.verifying
    }
}

impl Eq for PublicIdentity {}

impl fmt::Debug for PublicIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicIdentity")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Private key material. Both halves zeroize on drop.
#[derive(Clone)]
pub struct PrivateKeyBundle {
    pub encryption: SecretKey,
    pub signing: SigningKey,
}

impl PrivateKeyBundle {
    /// Generates fresh keypairs from OS randomness.
    pub fn generate() -> Self {
        Self {
            encryption: SecretKey::generate(&mut OsRng),
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn public_identity(&self) -> PublicIdentity {
        PublicIdentity {
            encryption: self.encryption.public_key(),
            verifying: self.signing.verifying_key(),
        }
    }

    pub fn to_file(&self) -> PrivateKeyFile {
        PrivateKeyFile {
            version: KEY_FILE_VERSION,
            encryption_secret: STANDARD.encode(self.encryption.to_bytes()),
            signing_secret: STANDARD.encode(self.signing.to_bytes()),
        }
    }

    pub fn from_file(file: &PrivateKeyFile) -> CryptoResult<Self> {
        if file.version != KEY_FILE_VERSION {
            return Err(CryptoError::Malformed(format!(
                "unsupported key file version {}",
                file.version
            )));
        }
        let encryption = decode_array::<32>(&file.encryption_secret, "encryption secret")?;
        let signing = decode_array::<32>(&file.signing_secret, "signing secret")?;
        Ok(Self {
            encryption: SecretKey::from(*encryption),
            signing: SigningKey::from_bytes(&signing),
        })
    }
}

impl fmt::Debug for PrivateKeyBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyBundle")
            .field("public", &self.public_identity())
            .finish_non_exhaustive()
    }
}

/// On-disk form of a [`PrivateKeyBundle`].
#[derive(Clone, Serialize, Deserialize)]
pub struct PrivateKeyFile {
    pub version: u32,
    pub encryption_secret: String,
    pub signing_secret: String,
}

fn decode_array<const N: usize>(encoded: &str, what: &str) -> CryptoResult<Zeroizing<[u8; N]>> {
    let bytes = Zeroizing::new(
        STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::Malformed(format!("{what}: {e}")))?,
    );
    if bytes.len() != N {
        return Err(CryptoError::InvalidKeyLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = Zeroizing::new([0u8; N]);
    out.copy_from_slice(&bytes);
    Ok(out)
}

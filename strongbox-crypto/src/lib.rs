//! Cryptographic primitives for Strongbox.
//!
//! Provides:
//! - AES-128/192/256 in counter mode for object bodies
//! - X25519 + XSalsa20-Poly1305 sealed fields for per-recipient metadata
//! - SHA-256, SHA-512 and BLAKE3 digests for the integrity hint
//! - Ed25519 signatures, certificates and revocation lists
//! - Argon2id password hashing
//!
//! # Architecture
//!
//! Higher layers never call a primitive directly. They go through the
//! [`CryptoProvider`] trait, so the whole vault can run against a different
//! backend without touching storage code.
//!
//! Scheme choice is separate from the provider: a [`SchemeSelector`] names the
//! symmetric and digest schemes for each new object, and the provider supplies
//! the key and IV bytes.

pub mod certificate;
pub mod envelope;
mod error;
mod keys;
mod password;
mod provider;
mod scheme;

pub use certificate::{
    Certificate, CertificateBody, CertificateStatus, RevocationBody, RevocationList, TrustAnchor,
    decode_signature,
};
pub use envelope::{SealedEnvelope, open_field, seal_field};
pub use error::{CryptoError, CryptoResult};
pub use keys::{KEY_FILE_VERSION, PrivateKeyBundle, PrivateKeyFile, PublicIdentity};
pub use password::{HASH_SIZE, KdfParams, PasswordHash, SALT_SIZE};
pub use provider::{CryptoProvider, SoftwareProvider};
pub use scheme::{
    DigestScheme, FixedSelector, IV_SIZE, RandomSelector, SchemeSelector, SymmetricScheme,
};

pub use crypto_box::{PublicKey, SecretKey};
pub use ed25519_dalek::{SigningKey, VerifyingKey};

//! Identity layer configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strongbox_crypto::KdfParams;

/// File name of the certificate assignment ledger.
pub const LEDGER_FILE: &str = "assigned_certs.txt";

/// Locations and policy for the identity layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// JSON user registry.
    pub registry_path: PathBuf,

    /// Certificate pool, one `<id>.crt` per certificate.
    pub certificate_dir: PathBuf,

    /// Private keys, one `<id>.key` per certificate.
    pub key_dir: PathBuf,

    /// Append-only `username=<id>.crt` ledger.
    pub ledger_path: PathBuf,

    pub trust_anchor_path: PathBuf,

    /// Optional; a missing file means nothing is revoked.
    pub revocation_list_path: PathBuf,

    /// Argon2id cost for new password hashes.
    pub kdf: KdfParams,

    /// Passwords accepted per login before giving up.
    pub max_password_attempts: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self::under("identity")
    }
}

impl IdentityConfig {
    /// Lays every identity file out below `base`.
    pub fn under(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            registry_path: base.join("users.json"),
            certificate_dir: base.join("certs"),
            key_dir: base.join("keys"),
            ledger_path: base.join(LEDGER_FILE),
            trust_anchor_path: base.join("trust_anchor.json"),
            revocation_list_path: base.join("revocations.json"),
            kdf: KdfParams::default(),
            max_password_attempts: 3,
        }
    }

    /// Same layout with test-strength password hashing.
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn certificate_path(&self, id: &str) -> PathBuf {
        self.certificate_dir.join(format!("{id}.crt"))
    }

    pub fn key_path(&self, id: &str) -> PathBuf {
        self.key_dir.join(format!("{id}.key"))
    }
}

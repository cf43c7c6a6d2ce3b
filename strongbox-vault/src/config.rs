//! Vault configuration.

use crate::error::VaultResult;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use strongbox_identity::IdentityConfig;
use tempfile::NamedTempFile;
use tracing::debug;

/// Every on-disk location used by a vault deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Per-user vault trees live at `<storage_root>/<username>`. Downloads
    /// may never target this tree.
    pub storage_root: PathBuf,

    /// CA-wide tree holding shared object triples.
    pub shared_root: PathBuf,

    /// Relative download destinations resolve against
    /// `<download_root>/<username>`.
    pub download_root: PathBuf,

    pub identity: IdentityConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self::under("strongbox")
    }
}

impl VaultConfig {
    /// Derives the full layout below one base directory.
    pub fn under(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            storage_root: base.join("vault"),
            shared_root: base.join("shared"),
            download_root: base.join("downloads"),
            identity: IdentityConfig::under(base.join("identity")),
        }
    }

    pub fn user_root(&self, username: &str) -> PathBuf {
        self.storage_root.join(username)
    }

    pub fn download_dir(&self, username: &str) -> PathBuf {
        self.download_root.join(username)
    }

    pub fn load(path: impl AsRef<Path>) -> VaultResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        debug!("loaded vault config from {}", path.display());
        Ok(config)
    }

    /// Writes pretty JSON atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> VaultResult<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

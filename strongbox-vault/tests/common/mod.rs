#![allow(dead_code)]

use chrono::Duration;
use std::path::PathBuf;
use std::sync::Arc;
use strongbox_crypto::{
    CryptoProvider, KdfParams, RandomSelector, SchemeSelector, SoftwareProvider,
};
use strongbox_identity::{CertificateAuthority, IdentityStore};
use strongbox_vault::{TreeEntry, TreeListing, VaultConfig, VaultManager};
use tempfile::TempDir;

pub const PASSWORD: &str = "correct horse battery staple";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A full deployment below one temp directory.
pub struct World {
    pub dir: TempDir,
    pub config: VaultConfig,
    pub ca: CertificateAuthority,
    pub identity: Arc<IdentityStore>,
    pub provider: Arc<dyn CryptoProvider>,
}

impl World {
    pub fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("box");
        Self::with_base(dir, base)
    }

    /// A deployment whose configured roots are relative to the working
    /// directory.
    pub fn relative() -> Self {
        init_tracing();
        let cwd = std::env::current_dir().unwrap();
        let dir = tempfile::tempdir_in(&cwd).unwrap();
        let base = dir.path().strip_prefix(&cwd).unwrap().join("box");
        assert!(base.is_relative());
        Self::with_base(dir, base)
    }

    fn with_base(dir: TempDir, base: PathBuf) -> Self {
        let mut config = VaultConfig::under(base);
        config.identity.kdf = KdfParams::testing();

        let ca = CertificateAuthority::generate("Strongbox Test CA");
        ca.install(&config.identity).unwrap();

        let provider: Arc<dyn CryptoProvider> = Arc::new(SoftwareProvider::new());
        let identity =
            Arc::new(IdentityStore::open(config.identity.clone(), provider.clone()).unwrap());
        Self {
            dir,
            config,
            ca,
            identity,
            provider,
        }
    }

    /// Issues a certificate for `username` and registers them.
    pub fn enroll(&self, username: &str) -> String {
        let (cert, keys) = self.ca.issue_for(username, Duration::days(30)).unwrap();
        self.identity.certificates().provision(&cert, &keys).unwrap();
        self.identity.register(username, PASSWORD).unwrap();
        cert.id().to_string()
    }

    pub fn open(&self, username: &str) -> VaultManager {
        self.open_with(username, Box::new(RandomSelector::seeded(11)))
    }

    pub fn open_with(&self, username: &str, selector: Box<dyn SchemeSelector>) -> VaultManager {
        let session = self.identity.login(username, PASSWORD).unwrap();
        VaultManager::open(
            self.config.clone(),
            self.identity.clone(),
            session,
            self.provider.clone(),
            selector,
        )
        .unwrap()
    }

    pub fn revoke(&mut self, certificate_id: &str) {
        self.ca.revoke(certificate_id);
        self.ca.publish_revocations(&self.config.identity).unwrap();
    }

    /// Writes a plaintext source file outside every vault tree.
    pub fn source(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let dir = self.dir.path().join("outside");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// An absolute download directory outside every vault tree.
    pub fn out_dir(&self) -> PathBuf {
        self.dir.path().join("restored")
    }
}

pub fn entries(listing: TreeListing) -> Vec<TreeEntry> {
    listing.collect_entries().unwrap()
}

/// Sets unix permission bits on `path`.
#[cfg(unix)]
pub fn set_mode(path: &std::path::Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).unwrap();
}

pub fn flip_byte(path: &std::path::Path, index: usize) {
    let mut bytes = std::fs::read(path).unwrap();
    bytes[index] ^= 0x01;
    std::fs::write(path, bytes).unwrap();
}

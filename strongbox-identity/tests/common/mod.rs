#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use strongbox_crypto::{Certificate, KdfParams, SoftwareProvider};
use strongbox_identity::{CertificateAuthority, IdentityConfig, IdentityStore};
use tempfile::TempDir;

pub const CA_NAME: &str = "Strongbox Test CA";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A temp directory with an installed authority and an empty pool.
pub struct Fixture {
    pub dir: TempDir,
    pub config: IdentityConfig,
    pub ca: CertificateAuthority,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let config =
            IdentityConfig::under(dir.path().join("identity")).with_kdf(KdfParams::testing());
        let ca = CertificateAuthority::generate(CA_NAME);
        ca.install(&config).unwrap();
        Self { dir, config, ca }
    }

    pub fn store(&self) -> IdentityStore {
        IdentityStore::open(self.config.clone(), Arc::new(SoftwareProvider::new())).unwrap()
    }

    /// Issues a 30-day certificate for `subject` into the pool.
    pub fn provision(&self, store: &IdentityStore, subject: &str) -> Certificate {
        let (cert, keys) = self.ca.issue_for(subject, Duration::days(30)).unwrap();
        store.certificates().provision(&cert, &keys).unwrap();
        cert
    }

    pub fn provision_window(
        &self,
        store: &IdentityStore,
        subject: &str,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    ) -> Certificate {
        let (cert, keys) = self.ca.issue(subject, not_before, not_after).unwrap();
        store.certificates().provision(&cert, &keys).unwrap();
        cert
    }

    /// Replaces a pooled certificate with a re-signed copy valid over
    /// `[not_before, not_after)`.
    pub fn reissue(
        &self,
        certificate_id: &str,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    ) -> Certificate {
        let path = self.config.certificate_path(certificate_id);
        let current: Certificate =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let reissued = self.ca.reissue(&current, not_before, not_after).unwrap();
        std::fs::write(&path, serde_json::to_vec(&reissued).unwrap()).unwrap();
        reissued
    }

    pub fn revoke(&mut self, certificate_id: &str) {
        self.ca.revoke(certificate_id);
        self.ca.publish_revocations(&self.config).unwrap();
    }
}

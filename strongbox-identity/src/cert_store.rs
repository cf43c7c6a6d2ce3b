//! Certificate pool, assignment ledger and validation gate.
//!
//! The pool is a directory of `<id>.crt` certificates with matching
//! `<id>.key` private keys. A certificate is bound to a username the first
//! time it is accepted for that user; the binding is appended to the ledger
//! as `username=<id>.crt` and never removed, so a certificate cannot be
//! handed out twice.

use crate::config::IdentityConfig;
use crate::error::{IdentityError, IdentityResult};
use crate::persist::{read_json, write_atomic, write_json};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use strongbox_crypto::{
    Certificate, CertificateStatus, CryptoProvider, PrivateKeyBundle, PrivateKeyFile,
    PublicIdentity, RevocationList, TrustAnchor,
};
use tracing::{debug, info, warn};

const CERT_EXTENSION: &str = "crt";

/// One `username=<id>.crt` ledger line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub username: String,
    pub certificate_id: String,
}

impl Assignment {
    fn to_line(&self) -> String {
        format!("{}={}.{CERT_EXTENSION}", self.username, self.certificate_id)
    }

    fn parse(line: &str) -> Option<Self> {
        let (username, file) = line.split_once('=')?;
        let id = file.trim().strip_suffix(&format!(".{CERT_EXTENSION}"))?;
        if username.is_empty() || id.is_empty() {
            return None;
        }
        Some(Self {
            username: username.to_string(),
            certificate_id: id.to_string(),
        })
    }
}

pub struct CertificateStore {
    config: IdentityConfig,
    provider: Arc<dyn CryptoProvider>,
    /// username -> public identity extracted from the bound certificate.
    public_cache: Mutex<HashMap<String, PublicIdentity>>,
}

impl CertificateStore {
    pub fn new(config: IdentityConfig, provider: Arc<dyn CryptoProvider>) -> Self {
        Self {
            config,
            provider,
            public_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    // ── Pool ─────────────────────────────────────────────────────

    /// Drops a certificate and its private keys into the pool.
    pub fn provision(
        &self,
        certificate: &Certificate,
        keys: &PrivateKeyBundle,
    ) -> IdentityResult<()> {
        write_json(&self.config.certificate_path(certificate.id()), certificate)?;
        write_json(&self.config.key_path(certificate.id()), &keys.to_file())?;
        debug!("provisioned certificate {} ({})", certificate.id(), certificate.subject());
        Ok(())
    }

    pub fn load_certificate(&self, id: &str) -> IdentityResult<Certificate> {
        read_json(&self.config.certificate_path(id))?
            .ok_or_else(|| IdentityError::CertificateNotFound(id.to_string()))
    }

    pub fn load_private_keys(&self, id: &str) -> IdentityResult<PrivateKeyBundle> {
        let file: PrivateKeyFile = read_json(&self.config.key_path(id))?
            .ok_or_else(|| IdentityError::CertificateNotFound(format!("{id} (private key)")))?;
        Ok(PrivateKeyBundle::from_file(&file)?)
    }

    /// Certificate ids in the pool, sorted.
    pub fn pool(&self) -> IdentityResult<Vec<String>> {
        let entries = match std::fs::read_dir(&self.config.certificate_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(IdentityError::Storage(e.to_string())),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| IdentityError::Storage(e.to_string()))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CERT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    // ── Trust ────────────────────────────────────────────────────

    pub fn trust_anchor(&self) -> IdentityResult<TrustAnchor> {
        read_json(&self.config.trust_anchor_path)?.ok_or_else(|| {
            IdentityError::TrustAnchorMissing(self.config.trust_anchor_path.display().to_string())
        })
    }

    pub fn revocation_list(&self) -> IdentityResult<Option<RevocationList>> {
        read_json(&self.config.revocation_list_path)
    }

    /// Validates a certificate against the installed anchor and revocation
    /// list as of now.
    pub fn validate_certificate(
        &self,
        certificate: &Certificate,
    ) -> IdentityResult<CertificateStatus> {
        let anchor = self.trust_anchor()?;
        let revocations = self.revocation_list()?;
        Ok(self
            .provider
            .validate_certificate(certificate, &anchor, revocations.as_ref(), Utc::now())?)
    }

    pub fn validate(&self, id: &str) -> IdentityResult<CertificateStatus> {
        let certificate = self.load_certificate(id)?;
        self.validate_certificate(&certificate)
    }

    // ── Ledger ───────────────────────────────────────────────────

    pub fn ledger(&self) -> IdentityResult<Vec<Assignment>> {
        let text = match std::fs::read_to_string(&self.config.ledger_path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(IdentityError::Storage(e.to_string())),
        };
        Ok(text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let parsed = Assignment::parse(line);
                if parsed.is_none() {
                    warn!("ignoring malformed ledger line {line:?}");
                }
                parsed
            })
            .collect())
    }

    /// The certificate id most recently bound to `username`.
    pub fn assignment_for(&self, username: &str) -> IdentityResult<Option<String>> {
        Ok(self
            .ledger()?
            .into_iter()
            .rev()
            .find(|a| a.username == username)
            .map(|a| a.certificate_id))
    }

    fn append_assignment(&self, assignment: &Assignment) -> IdentityResult<()> {
        let mut text = match std::fs::read_to_string(&self.config.ledger_path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(IdentityError::Storage(e.to_string())),
        };
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&assignment.to_line());
        text.push('\n');
        write_atomic(&self.config.ledger_path, text.as_bytes())
    }

    /// Binds a valid, unassigned certificate whose subject is `username`.
    ///
    /// An existing binding that still validates is returned unchanged.
    /// Otherwise the pool is scanned in id order; candidates that fail
    /// validation are skipped with their reason logged.
    pub fn assign_certificate(&self, username: &str) -> IdentityResult<String> {
        let ledger = self.ledger()?;

        if let Some(existing) = ledger.iter().rev().find(|a| a.username == username) {
            let status = self.validate(&existing.certificate_id)?;
            if status.is_valid() {
                debug!("{username} already bound to {}", existing.certificate_id);
                return Ok(existing.certificate_id.clone());
            }
            warn!(
                "existing certificate {} for {username} is {status}, looking for another",
                existing.certificate_id
            );
        }

        let taken: HashSet<&str> = ledger.iter().map(|a| a.certificate_id.as_str()).collect();
        let mut skipped = Vec::new();

        for id in self.pool()? {
            if taken.contains(id.as_str()) {
                continue;
            }
            let certificate = match self.load_certificate(&id) {
                Ok(c) => c,
                Err(e) => {
                    warn!("skipping unreadable certificate {id}: {e}");
                    continue;
                }
            };
            if certificate.subject() != username || certificate.id() != id {
                continue;
            }

            let status = self.validate_certificate(&certificate)?;
            if !status.is_valid() {
                warn!("skipping certificate {id} for {username}: {status}");
                skipped.push((id, status));
                continue;
            }

            self.append_assignment(&Assignment {
                username: username.to_string(),
                certificate_id: id.clone(),
            })?;
            info!("assigned certificate {id} to {username}");
            return Ok(id);
        }

        Err(IdentityError::NoValidCertificate {
            username: username.to_string(),
            skipped,
        })
    }

    // ── Public keys ──────────────────────────────────────────────

    /// Extracts the public identity from `username`'s certificate, caching it.
    pub fn derive_public_key(
        &self,
        username: &str,
        certificate_id: &str,
    ) -> IdentityResult<PublicIdentity> {
        let mut cache = self
            .public_cache
            .lock()
            .map_err(|e| IdentityError::Storage(e.to_string()))?;
        if let Some(public) = cache.get(username) {
            return Ok(public.clone());
        }
        let certificate = self.load_certificate(certificate_id)?;
        if certificate.subject() != username {
            return Err(IdentityError::KeyMismatch(username.to_string()));
        }
        let public = certificate.public_identity()?;
        cache.insert(username.to_string(), public.clone());
        Ok(public)
    }
}

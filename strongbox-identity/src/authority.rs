//! Certificate authority tooling.
//!
//! Issues identity certificates into the pool and publishes the trust anchor
//! and revocation list that every validation consults. Embedders use it to
//! seed a deployment; tests use it to build fixtures.

use crate::config::IdentityConfig;
use crate::error::IdentityResult;
use crate::persist::write_json;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use strongbox_crypto::{
    Certificate, CertificateBody, PrivateKeyBundle, RevocationBody, RevocationList, SigningKey,
    TrustAnchor,
};
use tracing::info;
use uuid::Uuid;

/// An issuing authority holding its Ed25519 signing key.
pub struct CertificateAuthority {
    name: String,
    signing: SigningKey,
    revoked: BTreeSet<String>,
}

impl CertificateAuthority {
    /// Creates an authority with a fresh signing key.
    pub fn generate(name: impl Into<String>) -> Self {
        Self::from_signing_key(name, PrivateKeyBundle::generate().signing)
    }

    pub fn from_signing_key(name: impl Into<String>, signing: SigningKey) -> Self {
        Self {
            name: name.into(),
            signing,
            revoked: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trust_anchor(&self) -> TrustAnchor {
        TrustAnchor::new(self.name.clone(), &self.signing.verifying_key())
    }

    /// Issues a certificate for `subject` valid over `[not_before, not_after)`,
    /// together with the subject's freshly generated private keys.
    pub fn issue(
        &self,
        subject: &str,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    ) -> IdentityResult<(Certificate, PrivateKeyBundle)> {
        let keys = PrivateKeyBundle::generate();
        let public = keys.public_identity();
        let body = CertificateBody {
            id: Uuid::new_v4().simple().to_string(),
            subject: subject.to_string(),
            issuer: self.name.clone(),
            not_before,
            not_after,
            encryption_key: public.encryption_b64(),
            verifying_key: public.verifying_b64(),
        };
        let certificate = Certificate::sign(body, &self.signing)?;
        info!("issued certificate {} for {subject}", certificate.id());
        Ok((certificate, keys))
    }

    /// Issues a certificate that is valid from now for `lifetime`.
    pub fn issue_for(
        &self,
        subject: &str,
        lifetime: Duration,
    ) -> IdentityResult<(Certificate, PrivateKeyBundle)> {
        let now = Utc::now();
        self.issue(subject, now - Duration::minutes(1), now + lifetime)
    }

    /// Re-signs `certificate` over a new validity window, keeping its id and
    /// subject keys so existing assignments stay bound to it.
    pub fn reissue(
        &self,
        certificate: &Certificate,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    ) -> IdentityResult<Certificate> {
        let body = CertificateBody {
            issuer: self.name.clone(),
            not_before,
            not_after,
            ..certificate.body.clone()
        };
        let reissued = Certificate::sign(body, &self.signing)?;
        info!("reissued certificate {} until {not_after}", reissued.id());
        Ok(reissued)
    }

    pub fn revoke(&mut self, certificate_id: &str) {
        self.revoked.insert(certificate_id.to_string());
    }

    pub fn revocation_list(&self) -> IdentityResult<RevocationList> {
        let body = RevocationBody {
            issuer: self.name.clone(),
            issued_at: Utc::now(),
            revoked: self.revoked.clone(),
        };
        Ok(RevocationList::sign(body, &self.signing)?)
    }

    /// Writes the trust anchor and the current revocation list.
    pub fn install(&self, config: &IdentityConfig) -> IdentityResult<()> {
        write_json(&config.trust_anchor_path, &self.trust_anchor())?;
        self.publish_revocations(config)
    }

    /// Rewrites only the revocation list.
    pub fn publish_revocations(&self, config: &IdentityConfig) -> IdentityResult<()> {
        write_json(&config.revocation_list_path, &self.revocation_list()?)?;
        info!(
            "published revocation list for {} ({} revoked)",
            self.name,
            self.revoked.len()
        );
        Ok(())
    }
}

//! Registration, login and the active session.

use crate::cert_store::CertificateStore;
use crate::config::IdentityConfig;
use crate::error::{IdentityError, IdentityResult};
use crate::registry::{UserRecord, UserRegistry};
use chrono::Utc;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use strongbox_crypto::{CryptoProvider, PasswordHash, PrivateKeyBundle, PublicIdentity};
use tracing::{debug, info, warn};

const MAX_USERNAME_LEN: usize = 64;

/// An authenticated user with their key material loaded.
#[derive(Clone)]
pub struct Session {
    username: String,
    public: PublicIdentity,
    keys: PrivateKeyBundle,
}

impl Session {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn public(&self) -> &PublicIdentity {
        &self.public
    }

    pub fn keys(&self) -> &PrivateKeyBundle {
        &self.keys
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Usernames double as directory names under the vault roots.
pub fn validate_username(username: &str) -> IdentityResult<()> {
    let ok = !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && !username.starts_with('.')
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(IdentityError::InvalidUsername(username.to_string()))
    }
}

/// Owns the user registry and the single active session.
pub struct IdentityStore {
    config: IdentityConfig,
    certificates: CertificateStore,
    registry: Mutex<UserRegistry>,
    active: Mutex<Option<Session>>,
}

impl IdentityStore {
    /// Loads the registry named by `config`.
    pub fn open(config: IdentityConfig, provider: Arc<dyn CryptoProvider>) -> IdentityResult<Self> {
        let registry = UserRegistry::load(&config.registry_path)?;
        info!("identity store opened with {} users", registry.len());
        Ok(Self {
            certificates: CertificateStore::new(config.clone(), provider),
            config,
            registry: Mutex::new(registry),
            active: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    pub fn certificates(&self) -> &CertificateStore {
        &self.certificates
    }

    fn registry(&self) -> IdentityResult<MutexGuard<'_, UserRegistry>> {
        self.registry
            .lock()
            .map_err(|e| IdentityError::Storage(e.to_string()))
    }

    fn active(&self) -> MutexGuard<'_, Option<Session>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Registration ─────────────────────────────────────────────

    /// Registers `username`, binding it to a freshly assigned certificate.
    ///
    /// The registry is untouched unless assignment and hashing both succeed.
    pub fn register(&self, username: &str, password: &str) -> IdentityResult<UserRecord> {
        validate_username(username)?;
        let mut registry = self.registry()?;
        if registry.contains(username) {
            return Err(IdentityError::AlreadyRegistered(username.to_string()));
        }

        let certificate_id = self.certificates.assign_certificate(username)?;
        let certificate = self.certificates.load_certificate(&certificate_id)?;
        let public = certificate.public_identity()?;
        let password = PasswordHash::create(password, self.config.kdf)?;

        let record = UserRecord {
            username: username.to_string(),
            password,
            private_key_file: self.config.key_path(&certificate_id),
            certificate_id,
            public_key_fingerprint: public.fingerprint(),
            created_at: Utc::now(),
            last_login_at: None,
        };

        registry.insert(record.clone())?;
        if let Err(e) = registry.flush() {
            registry.remove(username);
            return Err(e);
        }
        info!("registered {username} with certificate {}", record.certificate_id);
        Ok(record)
    }

    // ── Login ────────────────────────────────────────────────────

    /// Logs in with a single password.
    pub fn login(&self, username: &str, password: &str) -> IdentityResult<Session> {
        self.login_with_attempts(username, std::iter::once(password))
    }

    /// Logs in, drawing passwords from `attempts` until one matches or the
    /// configured attempt limit is reached.
    ///
    /// The bound certificate is validated before any password is drawn, so
    /// an interactive prompt behind `attempts` is never shown for a revoked
    /// or expired identity.
    pub fn login_with_attempts<I, S>(&self, username: &str, attempts: I) -> IdentityResult<Session>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let record = self.user(username)?;

        let certificate = self.certificates.load_certificate(&record.certificate_id)?;
        let status = self.certificates.validate_certificate(&certificate)?;
        if !status.is_valid() {
            warn!("login refused for {username}: certificate {}", status);
            return Err(IdentityError::Certificate(status));
        }
        let public = certificate.public_identity()?;
        if certificate.subject() != username
            || public.fingerprint() != record.public_key_fingerprint
        {
            return Err(IdentityError::KeyMismatch(username.to_string()));
        }

        let max = self.config.max_password_attempts;
        let mut tried = 0u32;
        let mut accepted = false;
        for candidate in attempts.into_iter().take(max as usize) {
            tried += 1;
            if record.password.verify(candidate.as_ref())? {
                accepted = true;
                break;
            }
            warn!("wrong password for {username} (attempt {tried} of {max})");
        }
        if !accepted {
            return Err(IdentityError::PasswordExhausted { attempts: tried });
        }

        let keys = self.certificates.load_private_keys(&record.certificate_id)?;
        if keys.public_identity() != public {
            return Err(IdentityError::KeyMismatch(username.to_string()));
        }

        {
            let mut registry = self.registry()?;
            registry.record_login(username, Utc::now())?;
            registry.flush()?;
        }

        let session = Session {
            username: username.to_string(),
            public,
            keys,
        };
        *self.active() = Some(session.clone());
        info!("{username} logged in");
        Ok(session)
    }

    pub fn logout(&self) {
        if let Some(session) = self.active().take() {
            info!("{} logged out", session.username);
        }
    }

    pub fn current_user(&self) -> Option<String> {
        self.active().as_ref().map(|s| s.username.clone())
    }

    pub fn current_session(&self) -> Option<Session> {
        self.active().clone()
    }

    // ── Lookup ───────────────────────────────────────────────────

    pub fn user(&self, username: &str) -> IdentityResult<UserRecord> {
        self.registry()?
            .get(username)
            .cloned()
            .ok_or_else(|| IdentityError::UserNotFound(username.to_string()))
    }

    pub fn is_registered(&self, username: &str) -> bool {
        self.registry().map(|r| r.contains(username)).unwrap_or(false)
    }

    pub fn usernames(&self) -> IdentityResult<Vec<String>> {
        Ok(self.registry()?.usernames().map(str::to_string).collect())
    }

    /// Public identity of a registered user, with the bound certificate
    /// re-validated now.
    pub fn resolve_public_identity(&self, username: &str) -> IdentityResult<PublicIdentity> {
        let record = self.user(username)?;
        let status = self.certificates.validate(&record.certificate_id)?;
        if !status.is_valid() {
            debug!("certificate for {username} is {status}");
            return Err(IdentityError::Certificate(status));
        }
        let public = self
            .certificates
            .derive_public_key(username, &record.certificate_id)?;
        if public.fingerprint() != record.public_key_fingerprint {
            return Err(IdentityError::KeyMismatch(username.to_string()));
        }
        Ok(public)
    }

    pub fn flush(&self) -> IdentityResult<()> {
        self.registry()?.flush()
    }
}

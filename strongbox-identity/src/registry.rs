//! Durable `username -> UserRecord` registry.

use crate::error::{IdentityError, IdentityResult};
use crate::persist::{read_json, write_json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use strongbox_crypto::PasswordHash;
use tracing::debug;

pub const REGISTRY_VERSION: u32 = 1;

/// A registered user. Certificate and key references never change after
/// registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password: PasswordHash,
    pub certificate_id: String,
    pub private_key_file: PathBuf,
    /// Fingerprint of the public identity in the bound certificate.
    pub public_key_fingerprint: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize)]
struct RegistryFile {
    version: u32,
    users: BTreeMap<String, UserRecord>,
}

/// In-memory registry with explicit load and flush.
pub struct UserRegistry {
    path: PathBuf,
    users: BTreeMap<String, UserRecord>,
}

impl UserRegistry {
    /// Loads the registry at `path`; a missing file is an empty registry.
    pub fn load(path: impl AsRef<Path>) -> IdentityResult<Self> {
        let path = path.as_ref().to_path_buf();
        let users = match read_json::<RegistryFile>(&path)? {
            Some(file) if file.version == REGISTRY_VERSION => file.users,
            Some(file) => return Err(IdentityError::UnsupportedVersion(file.version)),
            None => BTreeMap::new(),
        };
        debug!("loaded {} users from {}", users.len(), path.display());
        Ok(Self { path, users })
    }

    pub fn flush(&self) -> IdentityResult<()> {
        write_json(
            &self.path,
            &RegistryFile {
                version: REGISTRY_VERSION,
                users: self.users.clone(),
            },
        )
    }

    pub fn get(&self, username: &str) -> Option<&UserRecord> {
        self.users.get(username)
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.users.keys().map(String::as_str)
    }

    pub fn insert(&mut self, record: UserRecord) -> IdentityResult<()> {
        if self.users.contains_key(&record.username) {
            return Err(IdentityError::AlreadyRegistered(record.username));
        }
        self.users.insert(record.username.clone(), record);
        Ok(())
    }

    pub(crate) fn remove(&mut self, username: &str) -> Option<UserRecord> {
        self.users.remove(username)
    }

    pub fn record_login(&mut self, username: &str, at: DateTime<Utc>) -> IdentityResult<()> {
        let record = self
            .users
            .get_mut(username)
            .ok_or_else(|| IdentityError::UserNotFound(username.to_string()))?;
        record.last_login_at = Some(at);
        Ok(())
    }
}

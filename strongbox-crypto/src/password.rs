//! Salted password hashing (Argon2id).

use crate::error::{CryptoError, CryptoResult};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

pub const SALT_SIZE: usize = 16;
pub const HASH_SIZE: usize = 32;

/// Argon2id cost parameters. Recorded next to every hash so that changing
/// the defaults never locks out existing users.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Minimal cost, for tests only.
    pub fn testing() -> Self {
        Self {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn argon2(&self) -> CryptoResult<Argon2<'static>> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(HASH_SIZE),
        )
        .map_err(|e| CryptoError::KeyDerivation(format!("argon2 params: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// A salted password hash as stored in a user record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHash {
    /// Base64 salt.
    pub salt: String,
    /// Base64 Argon2id output.
    pub hash: String,
    pub params: KdfParams,
}

impl PasswordHash {
    /// Hashes `password` under a freshly generated salt.
    pub fn create(password: &str, params: KdfParams) -> CryptoResult<Self> {
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        let hash = derive(password, &salt, &params)?;
        Ok(Self {
            salt: STANDARD.encode(salt),
            hash: STANDARD.encode(hash.as_slice()),
            params,
        })
    }

    /// Re-derives the salted hash and compares in constant time.
    pub fn verify(&self, password: &str) -> CryptoResult<bool> {
        let salt = STANDARD
            .decode(&self.salt)
            .map_err(|e| CryptoError::Malformed(format!("password salt: {e}")))?;
        let expected = STANDARD
            .decode(&self.hash)
            .map_err(|e| CryptoError::Malformed(format!("password hash: {e}")))?;
        let actual = derive(password, &salt, &self.params)?;
        Ok(actual.as_slice().ct_eq(expected.as_slice()).into())
    }
}

fn derive(password: &str, salt: &[u8], params: &KdfParams) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let mut out = Zeroizing::new(vec![0u8; HASH_SIZE]);
    params
        .argon2()?
        .hash_password_into(password.as_bytes(), salt, &mut out)
        .map_err(|e| CryptoError::KeyDerivation(format!("argon2 derive: {e}")))?;
    Ok(out)
}

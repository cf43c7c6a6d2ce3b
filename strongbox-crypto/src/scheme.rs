//! Algorithm registries and scheme selection.
//!
//! Every stored object may use a different symmetric scheme and a different
//! digest scheme. The choice is made by a [`SchemeSelector`], which only
//! picks *names*: key and IV bytes always come from the provider's OS
//! randomness, so a seeded selector never weakens key material.

use crate::error::CryptoError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// IV length shared by every symmetric scheme (one AES block).
pub const IV_SIZE: usize = 16;

/// Symmetric schemes: three key strengths of AES in counter mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymmetricScheme {
    #[serde(rename = "AES-128")]
    Aes128,
    #[serde(rename = "AES-192")]
    Aes192,
    #[serde(rename = "AES-256")]
    Aes256,
}

impl SymmetricScheme {
    pub const ALL: [SymmetricScheme; 3] = [Self::Aes128, Self::Aes192, Self::Aes256];

    /// Canonical name, as recorded inside wrapped metadata.
    pub fn name(self) -> &'static str {
        match self {
            Self::Aes128 => "AES-128",
            Self::Aes192 => "AES-192",
            Self::Aes256 => "AES-256",
        }
    }

    /// Key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }

    pub fn iv_len(self) -> usize {
        IV_SIZE
    }
}

impl fmt::Display for SymmetricScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SymmetricScheme {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scheme| scheme.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CryptoError::UnsupportedScheme(format!("symmetric scheme {s:?}")))
    }
}

/// Digest schemes used for the cleartext integrity hint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestScheme {
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-512")]
    Sha512,
    #[serde(rename = "BLAKE3")]
    Blake3,
}

impl DigestScheme {
    pub const ALL: [DigestScheme; 3] = [Self::Sha256, Self::Sha512, Self::Blake3];

    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
            Self::Blake3 => "BLAKE3",
        }
    }

    /// Digest output length in bytes.
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha256 | Self::Blake3 => 32,
            Self::Sha512 => 64,
        }
    }
}

impl fmt::Display for DigestScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestScheme {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scheme| scheme.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CryptoError::UnsupportedScheme(format!("digest scheme {s:?}")))
    }
}

/// Picks the schemes for the next sealed object.
pub trait SchemeSelector: Send {
    fn symmetric(&mut self) -> SymmetricScheme;
    fn digest(&mut self) -> DigestScheme;
}

/// Uniform random selection over the scheme registries.
///
/// Seed it with [`RandomSelector::seeded`] to make the sequence of choices
/// reproducible in tests.
pub struct RandomSelector {
    rng: StdRng,
}

impl RandomSelector {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl SchemeSelector for RandomSelector {
    fn symmetric(&mut self) -> SymmetricScheme {
        SymmetricScheme::ALL[self.rng.gen_range(0..SymmetricScheme::ALL.len())]
    }

    fn digest(&mut self) -> DigestScheme {
        DigestScheme::ALL[self.rng.gen_range(0..DigestScheme::ALL.len())]
    }
}

/// Always returns the same pair of schemes.
#[derive(Clone, Copy, Debug)]
pub struct FixedSelector {
    pub symmetric: SymmetricScheme,
    pub digest: DigestScheme,
}

impl FixedSelector {
    pub fn new(symmetric: SymmetricScheme, digest: DigestScheme) -> Self {
        Self { symmetric, digest }
    }
}

impl SchemeSelector for FixedSelector {
    fn symmetric(&mut self) -> SymmetricScheme {
        self.symmetric
    }

    fn digest(&mut self) -> DigestScheme {
        self.digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for scheme in SymmetricScheme::ALL {
            assert_eq!(scheme.name().parse::<SymmetricScheme>().unwrap(), scheme);
        }
        for scheme in DigestScheme::ALL {
            assert_eq!(scheme.name().parse::<DigestScheme>().unwrap(), scheme);
        }
        assert_eq!("aes-256".parse::<SymmetricScheme>().unwrap(), SymmetricScheme::Aes256);
    }

    #[test]
    fn unknown_names_rejected() {
        assert!(matches!(
            "DES".parse::<SymmetricScheme>(),
            Err(CryptoError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            "MD5".parse::<DigestScheme>(),
            Err(CryptoError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn seeded_selector_is_reproducible() {
        let mut a = RandomSelector::seeded(42);
        let mut b = RandomSelector::seeded(42);
        for _ in 0..32 {
            assert_eq!(a.symmetric(), b.symmetric());
            assert_eq!(a.digest(), b.digest());
        }
    }

    #[test]
    fn random_selector_covers_every_scheme() {
        let mut selector = RandomSelector::seeded(7);
        let mut seen_sym = std::collections::HashSet::new();
        let mut seen_dgst = std::collections::HashSet::new();
        for _ in 0..200 {
            seen_sym.insert(selector.symmetric());
            seen_dgst.insert(selector.digest());
        }
        assert_eq!(seen_sym.len(), SymmetricScheme::ALL.len());
        assert_eq!(seen_dgst.len(), DigestScheme::ALL.len());
    }
}

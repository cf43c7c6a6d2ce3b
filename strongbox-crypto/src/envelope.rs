//! Wrapped-field encryption.
//!
//! Uses X25519 key exchange + XSalsa20-Poly1305 to seal short secrets (scheme
//! names, object keys, IVs, sender identities) for a recipient's public key.
//! Each seal uses a fresh ephemeral keypair, so the same field sealed twice
//! produces unrelated ciphertexts.

use crate::error::{CryptoError, CryptoResult};
use crypto_box::aead::Aead;
use crypto_box::aead::generic_array::GenericArray;
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use rand::RngCore;
use rand::rngs::OsRng;

/// Length of the ephemeral public key prefix.
pub const EPHEMERAL_KEY_SIZE: usize = 32;
/// Length of the XSalsa20 nonce.
pub const ENVELOPE_NONCE_SIZE: usize = 24;
/// Poly1305 tag appended to every sealed field.
pub const ENVELOPE_TAG_SIZE: usize = 16;

/// A field sealed with a recipient's X25519 public key.
///
/// The ephemeral public key is included so the recipient can reconstruct the
/// shared secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedEnvelope {
    /// Ephemeral X25519 public key (sender side of DH).
    pub ephemeral_public_key: [u8; EPHEMERAL_KEY_SIZE],
    /// XSalsa20 nonce.
    pub nonce: [u8; ENVELOPE_NONCE_SIZE],
    /// XSalsa20-Poly1305 ciphertext + tag.
    pub ciphertext: Vec<u8>,
}

impl SealedEnvelope {
    /// Serializes as `ephemeral_pk ‖ nonce ‖ ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(EPHEMERAL_KEY_SIZE + ENVELOPE_NONCE_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.ephemeral_public_key);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let header = EPHEMERAL_KEY_SIZE + ENVELOPE_NONCE_SIZE;
        if bytes.len() < header + ENVELOPE_TAG_SIZE {
            return Err(CryptoError::Malformed(format!(
                "sealed field too short: {} bytes",
                bytes.len()
            )));
        }
        let mut ephemeral_public_key = [0u8; EPHEMERAL_KEY_SIZE];
        ephemeral_public_key.copy_from_slice(&bytes[..EPHEMERAL_KEY_SIZE]);
        let mut nonce = [0u8; ENVELOPE_NONCE_SIZE];
        nonce.copy_from_slice(&bytes[EPHEMERAL_KEY_SIZE..header]);
        Ok(Self {
            ephemeral_public_key,
            nonce,
            ciphertext: bytes[header..].to_vec(),
        })
    }
}

/// Seals a field for a recipient using anonymous envelope encryption.
pub fn seal_field(plaintext: &[u8], recipient_pk: &PublicKey) -> CryptoResult<SealedEnvelope> {
    let ephemeral = SecretKey::generate(&mut OsRng);
    let ephemeral_pk = ephemeral.public_key();

    let salsa_box = SalsaBox::new(recipient_pk, &ephemeral);

    let mut nonce_bytes = [0u8; ENVELOPE_NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = salsa_box
        .encrypt(GenericArray::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("envelope seal failed: {e}")))?;

    Ok(SealedEnvelope {
        ephemeral_public_key: *ephemeral_pk.as_bytes(),
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Opens a sealed field using the recipient's secret key.
pub fn open_field(envelope: &SealedEnvelope, recipient_sk: &SecretKey) -> CryptoResult<Vec<u8>> {
    let ephemeral_pk = PublicKey::from(envelope.ephemeral_public_key);
    let salsa_box = SalsaBox::new(&ephemeral_pk, recipient_sk);

    salsa_box
        .decrypt(
            GenericArray::from_slice(&envelope.nonce),
            envelope.ciphertext.as_ref(),
        )
        .map_err(|_| {
            CryptoError::Decryption("envelope open failed (wrong key or tampered data)".to_string())
        })
}

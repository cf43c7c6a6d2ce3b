use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;
use strongbox_crypto::{
    CryptoProvider, DigestScheme, FixedSelector, PrivateKeyBundle, RandomSelector,
    SoftwareProvider, SymmetricScheme,
};
use strongbox_vault::{
    DigestLine, HybridCipher, Integrity, MetadataRecord, VaultError, WrappedFields,
};

fn provider() -> Arc<dyn CryptoProvider> {
    Arc::new(SoftwareProvider::new())
}

fn fixed(symmetric: SymmetricScheme, digest: DigestScheme) -> HybridCipher {
    HybridCipher::new(provider(), Box::new(FixedSelector::new(symmetric, digest)))
}

// ── Round trip ───────────────────────────────────────────────────

#[test]
fn every_scheme_combination_roundtrips() {
    let owner = PrivateKeyBundle::generate();
    let plaintext = b"algorithm agility means every object may differ".to_vec();

    for symmetric in SymmetricScheme::ALL {
        for digest in DigestScheme::ALL {
            let cipher = fixed(symmetric, digest);
            let sealed = cipher
                .seal_for_recipient(&plaintext, &owner.encryption.public_key(), None)
                .unwrap();
            assert_eq!(sealed.symmetric, symmetric);
            assert_eq!(sealed.metadata.digest.algorithm, digest);

            let text = sealed.metadata.encode().unwrap();
            let metadata = MetadataRecord::parse(&text).unwrap();
            let opened = cipher
                .open_with_key(&sealed.ciphertext, &metadata, &owner.encryption)
                .unwrap();

            assert_eq!(opened.plaintext, plaintext, "{symmetric} / {digest}");
            assert_eq!(opened.integrity, Integrity::Verified);
            assert_eq!(opened.sender, None);
        }
    }
}

#[test]
fn sender_identity_is_wrapped_and_recovered() {
    let recipient = PrivateKeyBundle::generate();
    let cipher = HybridCipher::new(provider(), Box::new(RandomSelector::seeded(3)));

    let sealed = cipher
        .seal_for_recipient(b"hi", &recipient.encryption.public_key(), Some("alice"))
        .unwrap();
    assert!(sealed.metadata.is_shared());

    let opened = cipher
        .open_with_key(&sealed.ciphertext, &sealed.metadata, &recipient.encryption)
        .unwrap();
    assert_eq!(opened.sender.as_deref(), Some("alice"));
}

#[test]
fn fresh_key_material_per_object() {
    let owner = PrivateKeyBundle::generate();
    let cipher = fixed(SymmetricScheme::Aes256, DigestScheme::Sha256);
    let public = owner.encryption.public_key();

    let a = cipher.seal_for_recipient(b"same bytes", &public, None).unwrap();
    let b = cipher.seal_for_recipient(b"same bytes", &public, None).unwrap();

    assert_ne!(a.ciphertext, b.ciphertext);
    assert_eq!(a.metadata.digest, b.metadata.digest);
}

#[test]
fn wrong_private_key_is_provider_error() {
    let owner = PrivateKeyBundle::generate();
    let stranger = PrivateKeyBundle::generate();
    let cipher = fixed(SymmetricScheme::Aes128, DigestScheme::Blake3);

    let sealed = cipher
        .seal_for_recipient(b"secret", &owner.encryption.public_key(), None)
        .unwrap();
    let err = cipher
        .open_with_key(&sealed.ciphertext, &sealed.metadata, &stranger.encryption)
        .err()
        .unwrap();
    assert!(matches!(err, VaultError::CryptoProvider(_)));
}

#[test]
fn tampered_digest_reports_mismatch() {
    let owner = PrivateKeyBundle::generate();
    let cipher = fixed(SymmetricScheme::Aes192, DigestScheme::Sha512);
    let mut sealed = cipher
        .seal_for_recipient(b"payload", &owner.encryption.public_key(), None)
        .unwrap();
    sealed.metadata.digest.value[0] ^= 0xFF;

    let opened = cipher
        .open_with_key(&sealed.ciphertext, &sealed.metadata, &owner.encryption)
        .unwrap();
    assert_eq!(opened.plaintext, b"payload");
    assert!(!opened.integrity.is_verified());
}

// ── Envelope boundary ────────────────────────────────────────────

fn sealed_text() -> String {
    let owner = PrivateKeyBundle::generate();
    fixed(SymmetricScheme::Aes128, DigestScheme::Sha256)
        .seal_for_recipient(b"x", &owner.encryption.public_key(), None)
        .unwrap()
        .metadata
        .encode()
        .unwrap()
}

#[test]
fn misspelled_field_marker_is_rejected() {
    let text = sealed_text().replace("\"algorithm\"", "\"algoritmh\"");
    assert!(matches!(
        MetadataRecord::parse(&text),
        Err(VaultError::Validation(_))
    ));
}

#[test]
fn unknown_envelope_version_rejected() {
    let text = sealed_text().replace("strongbox-envelope v1", "strongbox-envelope v2");
    assert!(matches!(
        MetadataRecord::parse(&text),
        Err(VaultError::Validation(_))
    ));
}

#[test]
fn truncated_envelope_rejected() {
    let text = sealed_text();
    let first_two: String = text.lines().take(2).collect::<Vec<_>>().join("\n");
    assert!(matches!(
        MetadataRecord::parse(&first_two),
        Err(VaultError::Validation(_))
    ));
    assert!(matches!(
        MetadataRecord::parse(""),
        Err(VaultError::Validation(_))
    ));
}

#[test]
fn extra_lines_rejected() {
    let text = format!("{}key=extra\n", sealed_text());
    assert!(matches!(
        MetadataRecord::parse(&text),
        Err(VaultError::Validation(_))
    ));
}

#[test]
fn bad_base64_field_rejected() {
    let text = sealed_text();
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let mut json: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
    json["iv"] = serde_json::json!("***");
    lines[2] = json.to_string();
    assert!(matches!(
        MetadataRecord::parse(&lines.join("\n")),
        Err(VaultError::Validation(_))
    ));
}

fn digest_line() -> impl Strategy<Value = DigestLine> {
    (0usize..3).prop_flat_map(|i| {
        let algorithm = DigestScheme::ALL[i];
        proptest::collection::vec(any::<u8>(), algorithm.output_len())
            .prop_map(move |value| DigestLine { algorithm, value })
    })
}

fn wrapped_fields() -> impl Strategy<Value = WrappedFields> {
    let bytes = || proptest::collection::vec(any::<u8>(), 0..96);
    (bytes(), bytes(), bytes(), proptest::option::of(bytes())).prop_map(
        |(algorithm, iv, key, sender)| WrappedFields {
            algorithm,
            iv,
            key,
            sender,
        },
    )
}

proptest! {
    #[test]
    fn envelope_parse_inverts_encode(digest in digest_line(), wrapped in wrapped_fields()) {
        let record = MetadataRecord { digest, wrapped };
        let text = record.encode().unwrap();
        prop_assert_eq!(MetadataRecord::parse(&text).unwrap(), record);
    }
}

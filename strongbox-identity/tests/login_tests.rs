mod common;

use chrono::{Duration, Utc};
use common::Fixture;
use std::cell::Cell;
use strongbox_crypto::{CertificateStatus, PrivateKeyBundle};
use strongbox_identity::{IdentityError, IdentityStore};

fn registered(fx: &Fixture, username: &str, password: &str) -> IdentityStore {
    let store = fx.store();
    fx.provision(&store, username);
    store.register(username, password).unwrap();
    store
}

// ── Success ──────────────────────────────────────────────────────

#[test]
fn login_sets_active_session() {
    let fx = Fixture::new();
    let store = registered(&fx, "alice", "pw");

    let session = store.login("alice", "pw").unwrap();

    assert_eq!(session.username(), "alice");
    assert_eq!(store.current_user().as_deref(), Some("alice"));
    let record = store.user("alice").unwrap();
    assert_eq!(session.public().fingerprint(), record.public_key_fingerprint);
    assert!(record.last_login_at.is_some());
}

#[test]
fn last_login_is_flushed() {
    let fx = Fixture::new();
    let store = registered(&fx, "alice", "pw");
    store.login("alice", "pw").unwrap();

    let reopened = fx.store();
    assert!(reopened.user("alice").unwrap().last_login_at.is_some());
}

#[test]
fn third_attempt_may_succeed() {
    let fx = Fixture::new();
    let store = registered(&fx, "alice", "pw");

    let session = store
        .login_with_attempts("alice", ["nope", "still no", "pw"])
        .unwrap();
    assert_eq!(session.username(), "alice");
}

#[test]
fn logout_clears_session() {
    let fx = Fixture::new();
    let store = registered(&fx, "alice", "pw");
    store.login("alice", "pw").unwrap();

    store.logout();
    assert!(store.current_user().is_none());
    assert!(store.current_session().is_none());
}

// ── Password failures ────────────────────────────────────────────

#[test]
fn unknown_user_rejected() {
    let fx = Fixture::new();
    let store = fx.store();
    assert!(matches!(
        store.login("ghost", "pw"),
        Err(IdentityError::UserNotFound(_))
    ));
}

#[test]
fn wrong_password_rejected() {
    let fx = Fixture::new();
    let store = registered(&fx, "alice", "pw");

    let err = store.login("alice", "wrong").unwrap_err();
    assert!(matches!(err, IdentityError::PasswordExhausted { attempts: 1 }));
    assert!(store.current_user().is_none());
}

#[test]
fn attempts_capped_at_three() {
    let fx = Fixture::new();
    let store = registered(&fx, "alice", "pw");
    let drawn = Cell::new(0);
    let prompts = std::iter::repeat_with(|| {
        drawn.set(drawn.get() + 1);
        "wrong"
    });

    let err = store.login_with_attempts("alice", prompts).unwrap_err();
    assert!(matches!(err, IdentityError::PasswordExhausted { attempts: 3 }));
    assert_eq!(drawn.get(), 3);
}

#[test]
fn fourth_password_never_considered() {
    let fx = Fixture::new();
    let store = registered(&fx, "alice", "pw");
    let err = store
        .login_with_attempts("alice", ["a", "b", "c", "pw"])
        .unwrap_err();
    assert!(matches!(err, IdentityError::PasswordExhausted { attempts: 3 }));
}

// ── Certificate gate ─────────────────────────────────────────────

#[test]
fn revoked_certificate_blocks_login_before_password() {
    let mut fx = Fixture::new();
    let store = registered(&fx, "alice", "pw");
    let id = store.user("alice").unwrap().certificate_id;
    fx.revoke(&id);

    let drawn = Cell::new(0);
    let prompts = std::iter::repeat_with(|| {
        drawn.set(drawn.get() + 1);
        "pw"
    });
    let err = store.login_with_attempts("alice", prompts).unwrap_err();

    assert!(matches!(
        err,
        IdentityError::Certificate(CertificateStatus::Revoked)
    ));
    assert_eq!(drawn.get(), 0);
}

#[test]
fn expired_certificate_blocks_login_before_password() {
    let fx = Fixture::new();
    let store = registered(&fx, "alice", "pw");
    let id = store.user("alice").unwrap().certificate_id;
    let now = Utc::now();
    let reissued = fx.reissue(&id, now - Duration::days(30), now - Duration::days(1));
    assert_eq!(reissued.id(), id);

    let drawn = Cell::new(0);
    let prompts = std::iter::repeat_with(|| {
        drawn.set(drawn.get() + 1);
        "pw"
    });
    let err = store.login_with_attempts("alice", prompts).unwrap_err();

    assert!(matches!(
        err,
        IdentityError::Certificate(CertificateStatus::Expired)
    ));
    assert_eq!(drawn.get(), 0);
    assert_eq!(store.current_user(), None);
}

#[test]
fn reissued_certificate_keeps_login_working() {
    let fx = Fixture::new();
    let store = registered(&fx, "alice", "pw");
    let id = store.user("alice").unwrap().certificate_id;
    let now = Utc::now();
    fx.reissue(&id, now - Duration::days(1), now + Duration::days(365));

    let session = store.login("alice", "pw").unwrap();
    assert_eq!(session.username(), "alice");
}

#[test]
fn missing_certificate_file_blocks_login() {
    let fx = Fixture::new();
    let store = registered(&fx, "alice", "pw");
    let id = store.user("alice").unwrap().certificate_id;
    std::fs::remove_file(fx.config.certificate_path(&id)).unwrap();

    assert!(matches!(
        store.login("alice", "pw"),
        Err(IdentityError::CertificateNotFound(_))
    ));
}

#[test]
fn edited_certificate_is_untrusted() {
    let fx = Fixture::new();
    let store = registered(&fx, "alice", "pw");
    let id = store.user("alice").unwrap().certificate_id;
    let path = fx.config.certificate_path(&id);
    let text = std::fs::read_to_string(&path).unwrap();
    let mut json: serde_json::Value = serde_json::from_str(&text).unwrap();
    json["body"]["not_after"] = serde_json::json!("2999-01-01T00:00:00Z");
    std::fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();

    assert!(matches!(
        store.login("alice", "pw"),
        Err(IdentityError::Certificate(CertificateStatus::UntrustedIssuer))
    ));
}

#[test]
fn swapped_private_key_detected() {
    let fx = Fixture::new();
    let store = registered(&fx, "alice", "pw");
    let id = store.user("alice").unwrap().certificate_id;
    let foreign = PrivateKeyBundle::generate().to_file();
    std::fs::write(
        fx.config.key_path(&id),
        serde_json::to_vec(&foreign).unwrap(),
    )
    .unwrap();

    assert!(matches!(
        store.login("alice", "pw"),
        Err(IdentityError::KeyMismatch(_))
    ));
}

// ── Public identity resolution ───────────────────────────────────

#[test]
fn resolves_registered_identity() {
    let fx = Fixture::new();
    let store = registered(&fx, "bob", "pw");
    let session = store.login("bob", "pw").unwrap();

    let resolved = store.resolve_public_identity("bob").unwrap();
    assert_eq!(&resolved, session.public());
}

#[test]
fn resolve_unknown_user_is_not_found() {
    let fx = Fixture::new();
    let store = fx.store();
    assert!(matches!(
        store.resolve_public_identity("nobody"),
        Err(IdentityError::UserNotFound(_))
    ));
}

#[test]
fn resolve_revalidates_certificate() {
    let mut fx = Fixture::new();
    let store = registered(&fx, "bob", "pw");
    store.resolve_public_identity("bob").unwrap();

    let id = store.user("bob").unwrap().certificate_id;
    fx.revoke(&id);

    assert!(matches!(
        store.resolve_public_identity("bob"),
        Err(IdentityError::Certificate(CertificateStatus::Revoked))
    ));
}

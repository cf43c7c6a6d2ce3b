//! Identity layer for Strongbox.
//!
//! Binds usernames to CA-issued certificates and password hashes, and gates
//! registration and login on certificate validity:
//!
//! - [`CertificateStore`] owns the certificate pool, the `username=<id>.crt`
//!   assignment ledger and validation against the installed trust anchor.
//! - [`IdentityStore`] owns the user registry and the single active
//!   [`Session`].
//! - [`CertificateAuthority`] issues certificates and publishes the trust
//!   anchor and revocation list.

mod authority;
mod cert_store;
mod config;
mod error;
mod persist;
mod registry;
mod store;

pub use authority::CertificateAuthority;
pub use cert_store::{Assignment, CertificateStore};
pub use config::{IdentityConfig, LEDGER_FILE};
pub use error::{IdentityError, IdentityResult};
pub use registry::{REGISTRY_VERSION, UserRecord, UserRegistry};
pub use store::{IdentityStore, Session, validate_username};

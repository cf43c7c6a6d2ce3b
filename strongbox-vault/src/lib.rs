//! Encrypted per-user vaults with signed peer sharing.
//!
//! Every object is stored as sibling files sharing a base name:
//!
//! - `<base>.enc`: the symmetrically encrypted body
//! - `<base>.meta`: the metadata envelope (cleartext digest plus wrapped
//!   scheme, key and IV)
//! - `<base>.sgn`: a detached Ed25519 signature, shared objects only
//!
//! Owned objects live under `<storage_root>/<username>` and are sealed for
//! the owner's own key. Shared objects live in one CA-wide tree, sealed for
//! the recipient and signed by the sender.
//!
//! Integrity policy differs between the two on purpose. An owned object
//! whose digest does not match is still delivered, with the mismatch on the
//! [`DownloadReport`]. A shared object whose sender or signature does not
//! check out is rejected with [`VaultError::Trust`] and nothing is written.

mod cipher;
mod config;
mod error;
mod manager;
pub mod metadata;
pub mod paths;
mod signature;
mod tree;

pub use cipher::{HybridCipher, Integrity, OpenedObject, SealedObject};
pub use config::VaultConfig;
pub use error::{VaultError, VaultResult};
pub use manager::{DeletionFailure, DeletionReport, DownloadReport, StoredObject, VaultManager};
pub use metadata::{DigestLine, ENVELOPE_HEADER, MetadataRecord, WrappedFields};
pub use paths::{ObjectPaths, ensure_outside, resolve_within};
pub use signature::{SignatureBlob, SignatureService};
pub use tree::{EntryKind, TreeEntry, TreeListing, TreeWalk, list_tree};

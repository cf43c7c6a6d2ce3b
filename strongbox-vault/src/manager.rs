//! The vault manager: every user-facing file operation for one session.

use crate::cipher::{HybridCipher, Integrity, OpenedObject};
use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult, io_not_found};
use crate::metadata::MetadataRecord;
use crate::paths::{
    ObjectPaths, absolute, ensure_outside, normalize, resolve_within, single_component,
};
use crate::signature::{SignatureBlob, SignatureService};
use crate::tree::{TreeListing, list_tree};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strongbox_crypto::{CryptoProvider, SchemeSelector};
use strongbox_identity::{IdentityStore, Session};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Sibling files written for one object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub ciphertext: PathBuf,
    pub metadata: PathBuf,
    /// Present on shared objects only.
    pub signature: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadReport {
    /// Where the plaintext was written.
    pub path: PathBuf,
    pub integrity: Integrity,
    /// Verified sender of a shared object.
    pub sender: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletionFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub removed: Vec<PathBuf>,
    pub failures: Vec<DeletionFailure>,
}

impl DeletionReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct VaultManager {
    config: VaultConfig,
    identity: Arc<IdentityStore>,
    session: Session,
    cipher: HybridCipher,
    signatures: SignatureService,
    user_root: PathBuf,
    download_dir: PathBuf,
}

impl VaultManager {
    /// Opens the vault of the identity store's active session, creating the
    /// user's vault root, the shared root and the user's download directory.
    pub fn open(
        mut config: VaultConfig,
        identity: Arc<IdentityStore>,
        session: Session,
        provider: Arc<dyn CryptoProvider>,
        selector: Box<dyn SchemeSelector>,
    ) -> VaultResult<Self> {
        if identity.current_user().as_deref() != Some(session.username()) {
            return Err(VaultError::Auth(format!(
                "{} has no active session",
                session.username()
            )));
        }

        config.storage_root = absolute(&config.storage_root)?;
        config.shared_root = absolute(&config.shared_root)?;
        config.download_root = absolute(&config.download_root)?;
        let user_root = config.user_root(session.username());
        let download_dir = config.download_dir(session.username());
        std::fs::create_dir_all(&user_root)?;
        std::fs::create_dir_all(&config.shared_root)?;
        std::fs::create_dir_all(&download_dir)?;
        info!("opened vault for {}", session.username());

        Ok(Self {
            cipher: HybridCipher::new(provider.clone(), selector),
            signatures: SignatureService::new(provider),
            config,
            identity,
            session,
            user_root,
            download_dir,
        })
    }

    pub fn username(&self) -> &str {
        self.session.username()
    }

    pub fn user_root(&self) -> &Path {
        &self.user_root
    }

    pub fn shared_root(&self) -> &Path {
        &self.config.shared_root
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    // ── Owned objects ────────────────────────────────────────────

    /// Encrypts `source` for the owner and stores it under `target_dir`
    /// (relative to the vault root; created if missing).
    pub fn add_file(
        &self,
        source: &Path,
        target_dir: impl AsRef<Path>,
    ) -> VaultResult<StoredObject> {
        let dir = resolve_within(&self.user_root, target_dir)?;
        let file_name = source_name(source)?;
        let plaintext = std::fs::read(source).map_err(|e| io_not_found(e, source.display()))?;

        std::fs::create_dir_all(&dir)?;
        let sealed = self
            .cipher
            .seal_for_recipient(&plaintext, &self.session.public().encryption, None)?;
        let paths = ObjectPaths::new(dir.join(file_name));
        write_object(&paths, &sealed.ciphertext, &sealed.metadata.encode()?, None)?;

        info!("{} stored {}", self.username(), paths.base.display());
        Ok(StoredObject {
            ciphertext: paths.ciphertext,
            metadata: paths.metadata,
            signature: None,
        })
    }

    /// Decrypts the owned object `name` into `destination`.
    ///
    /// A digest mismatch is logged and reported, and the recovered bytes are
    /// written anyway.
    pub fn download_file(&self, name: &str, destination: &Path) -> VaultResult<DownloadReport> {
        let dest_dir = self.resolve_destination(destination)?;
        let paths = object_paths(&self.user_root, name)?;
        let (ciphertext, metadata) = read_pair(&paths)?;

        let opened = self
            .cipher
            .open_with_key(&ciphertext, &metadata, &self.session.keys().encryption)?;
        if let Integrity::Mismatch { expected, actual } = &opened.integrity {
            warn!(
                "integrity mismatch on {}: recorded {expected}, recovered {actual}",
                paths.base.display()
            );
        }

        let path = write_plaintext(&dest_dir, &paths, &opened.plaintext)?;
        info!("{} downloaded {} to {}", self.username(), name, path.display());
        Ok(DownloadReport {
            path,
            integrity: opened.integrity,
            sender: None,
        })
    }

    // ── Shared objects ───────────────────────────────────────────

    /// Signs `source`, seals it for `recipient` and drops the triple into the
    /// shared tree under the source's file name. An existing share with the
    /// same name is replaced.
    pub fn add_file_to_shared(&self, source: &Path, recipient: &str) -> VaultResult<StoredObject> {
        let recipient_public = self.identity.resolve_public_identity(recipient)?;
        let file_name = source_name(source)?;
        let plaintext = std::fs::read(source).map_err(|e| io_not_found(e, source.display()))?;

        let signature = self.signatures.sign(&plaintext, &self.session.keys().signing)?;
        let sealed = self.cipher.seal_for_recipient(
            &plaintext,
            &recipient_public.encryption,
            Some(self.username()),
        )?;
        let paths = ObjectPaths::new(self.config.shared_root.join(file_name));
        write_object(
            &paths,
            &sealed.ciphertext,
            &sealed.metadata.encode()?,
            Some(signature.as_str()),
        )?;

        info!(
            "{} shared {} with {recipient}",
            self.username(),
            paths.base.display()
        );
        Ok(StoredObject {
            ciphertext: paths.ciphertext,
            metadata: paths.metadata,
            signature: Some(paths.signature),
        })
    }

    /// Decrypts a shared object addressed to the current user.
    ///
    /// Nothing is written unless the sender resolves to a currently valid
    /// identity and the detached signature verifies over the plaintext.
    pub fn download_file_from_shared(
        &self,
        name: &str,
        destination: &Path,
    ) -> VaultResult<DownloadReport> {
        let dest_dir = self.resolve_destination(destination)?;
        let paths = object_paths(&self.config.shared_root, name)?;
        let (ciphertext, metadata) = read_pair(&paths)?;
        let blob = std::fs::read_to_string(&paths.signature)
            .map(SignatureBlob::from_encoded)
            .map_err(|e| io_not_found(e, paths.signature.display()))?;

        let opened = self
            .cipher
            .open_with_key(&ciphertext, &metadata, &self.session.keys().encryption)?;
        let sender = self.verify_sender(&opened, &blob)?;

        if let Integrity::Mismatch { expected, actual } = &opened.integrity {
            warn!(
                "digest mismatch on signed share {}: recorded {expected}, recovered {actual}",
                paths.base.display()
            );
        }

        let path = write_plaintext(&dest_dir, &paths, &opened.plaintext)?;
        info!(
            "{} downloaded shared {} from {sender}",
            self.username(),
            paths.base.display()
        );
        Ok(DownloadReport {
            path,
            integrity: opened.integrity,
            sender: Some(sender),
        })
    }

    fn verify_sender(&self, opened: &OpenedObject, blob: &SignatureBlob) -> VaultResult<String> {
        let sender = opened
            .sender
            .clone()
            .ok_or_else(|| VaultError::Trust("shared object carries no sender identity".into()))?;
        let public = self
            .identity
            .resolve_public_identity(&sender)
            .map_err(|e| VaultError::Trust(format!("sender {sender} cannot be trusted: {e}")))?;
        if !self
            .signatures
            .verify(&opened.plaintext, blob, &public.verifying)
        {
            return Err(VaultError::Trust(format!(
                "signature from {sender} does not verify"
            )));
        }
        Ok(sender)
    }

    // ── Directories ──────────────────────────────────────────────

    pub fn create_directory(&self, parent: impl AsRef<Path>, name: &str) -> VaultResult<PathBuf> {
        single_component(name)?;
        let parent = resolve_within(&self.user_root, parent)?;
        if !parent.is_dir() {
            return Err(VaultError::NotFound(parent.display().to_string()));
        }
        let dir = parent.join(name);
        if dir.exists() {
            return Err(VaultError::Validation(format!(
                "{} already exists",
                dir.display()
            )));
        }
        std::fs::create_dir(&dir)?;
        info!("{} created {}", self.username(), dir.display());
        Ok(dir)
    }

    /// Removes a directory bottom-up, continuing past entries that fail.
    pub fn delete_directory(&self, path: impl AsRef<Path>) -> VaultResult<DeletionReport> {
        let dir = resolve_within(&self.user_root, path)?;
        if dir == self.user_root {
            return Err(VaultError::Validation("the vault root cannot be deleted".into()));
        }
        if !dir.is_dir() {
            return Err(VaultError::NotFound(dir.display().to_string()));
        }

        let mut report = DeletionReport::default();
        for entry in WalkDir::new(&dir).contents_first(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.clone());
                    warn!("cannot visit {}: {e}", path.display());
                    report.failures.push(DeletionFailure {
                        path,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            let result = if entry.file_type().is_dir() {
                std::fs::remove_dir(entry.path())
            } else {
                std::fs::remove_file(entry.path())
            };
            match result {
                Ok(()) => report.removed.push(entry.into_path()),
                Err(e) => {
                    warn!("failed to delete {}: {e}", entry.path().display());
                    report.failures.push(DeletionFailure {
                        path: entry.into_path(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "{} deleted {} ({} removed, {} failed)",
            self.username(),
            dir.display(),
            report.removed.len(),
            report.failures.len()
        );
        Ok(report)
    }

    // ── Listing ──────────────────────────────────────────────────

    pub fn list_own(&self) -> VaultResult<TreeListing> {
        list_tree(&self.user_root)
    }

    pub fn list_shared(&self) -> VaultResult<TreeListing> {
        list_tree(&self.config.shared_root)
    }

    /// Lists a subtree of the user's vault.
    pub fn list_tree(&self, root: impl AsRef<Path>) -> VaultResult<TreeListing> {
        list_tree(&resolve_within(&self.user_root, root)?)
    }

    // ── Helpers ──────────────────────────────────────────────────

    /// Relative destinations resolve against the user's download directory.
    /// No vault tree may be a destination.
    fn resolve_destination(&self, destination: &Path) -> VaultResult<PathBuf> {
        let dest = if destination.is_absolute() {
            normalize(destination)
        } else {
            normalize(&self.download_dir.join(destination))
        };
        ensure_outside(&self.config.storage_root, &dest)?;
        ensure_outside(&self.config.shared_root, &dest)?;
        debug!("download destination {}", dest.display());
        Ok(dest)
    }
}

fn source_name(source: &Path) -> VaultResult<&std::ffi::OsStr> {
    source
        .file_name()
        .ok_or_else(|| VaultError::Validation(format!("{} has no file name", source.display())))
}

/// Resolves an object name below `root`. The root itself names no object.
fn object_paths(root: &Path, name: &str) -> VaultResult<ObjectPaths> {
    let base = resolve_within(root, name)?;
    if base == normalize(root) {
        return Err(VaultError::Validation(format!("{name:?} does not name an object")));
    }
    Ok(ObjectPaths::new(base))
}

fn read_pair(paths: &ObjectPaths) -> VaultResult<(Vec<u8>, MetadataRecord)> {
    let ciphertext =
        std::fs::read(&paths.ciphertext).map_err(|e| io_not_found(e, paths.ciphertext.display()))?;
    let text = std::fs::read_to_string(&paths.metadata)
        .map_err(|e| io_not_found(e, paths.metadata.display()))?;
    Ok((ciphertext, MetadataRecord::parse(&text)?))
}

/// Stages every sibling next to its target, then renames sidecars first and
/// the ciphertext last.
fn write_object(
    paths: &ObjectPaths,
    ciphertext: &[u8],
    metadata: &str,
    signature: Option<&str>,
) -> VaultResult<()> {
    let dir = paths
        .ciphertext
        .parent()
        .ok_or_else(|| VaultError::Validation("object has no parent directory".into()))?;

    let mut staged = Vec::with_capacity(3);
    if let Some(signature) = signature {
        staged.push((stage(dir, signature.as_bytes())?, &paths.signature));
    }
    staged.push((stage(dir, metadata.as_bytes())?, &paths.metadata));
    staged.push((stage(dir, ciphertext)?, &paths.ciphertext));

    for (tmp, target) in staged {
        tmp.persist(target).map_err(|e| e.error)?;
    }
    Ok(())
}

fn stage(dir: &Path, bytes: &[u8]) -> VaultResult<NamedTempFile> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

fn write_plaintext(dest_dir: &Path, paths: &ObjectPaths, plaintext: &[u8]) -> VaultResult<PathBuf> {
    let file_name = paths
        .plain_name()
        .ok_or_else(|| VaultError::Validation("object has no file name".into()))?;
    std::fs::create_dir_all(dest_dir)?;
    let target = dest_dir.join(file_name);
    stage(dest_dir, plaintext)?
        .persist(&target)
        .map_err(|e| e.error)?;
    Ok(target)
}

//! Path containment.
//!
//! Normalisation is lexical: `.` is dropped and `..` removes the previous
//! component. Symlinks inside a vault tree are not followed.

use crate::error::{VaultError, VaultResult};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

pub const CIPHERTEXT_EXT: &str = "enc";
pub const METADATA_EXT: &str = "meta";
pub const SIGNATURE_EXT: &str = "sgn";

pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolves `requested` against `root`, rejecting anything that lands
/// outside it. Absolute paths are accepted only when already inside `root`.
pub fn resolve_within(root: &Path, requested: impl AsRef<Path>) -> VaultResult<PathBuf> {
    let requested = requested.as_ref();
    let root = normalize(root);
    let candidate = if requested.is_absolute() {
        normalize(requested)
    } else {
        normalize(&root.join(requested))
    };
    if candidate.starts_with(&root) {
        Ok(candidate)
    } else {
        Err(VaultError::Validation(format!(
            "{} escapes the vault root",
            requested.display()
        )))
    }
}

/// Anchors `path` at the working directory when relative, then normalizes.
pub fn absolute(path: &Path) -> VaultResult<PathBuf> {
    Ok(normalize(&std::path::absolute(path)?))
}

/// Rejects a destination inside `prohibited`. Both sides are compared in
/// absolute form.
pub fn ensure_outside(prohibited: &Path, destination: &Path) -> VaultResult<()> {
    if absolute(destination)?.starts_with(absolute(prohibited)?) {
        return Err(VaultError::Validation(format!(
            "{} is inside the vault storage tree",
            destination.display()
        )));
    }
    Ok(())
}

/// Checks that `name` is a single plain path component.
pub fn single_component(name: &str) -> VaultResult<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.starts_with('.') => Ok(()),
        _ => Err(VaultError::Validation(format!("invalid name {name:?}"))),
    }
}

/// The sibling files of one stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectPaths {
    /// Object path without extension, e.g. `docs/report.pdf`.
    pub base: PathBuf,
    pub ciphertext: PathBuf,
    pub metadata: PathBuf,
    pub signature: PathBuf,
}

impl ObjectPaths {
    /// `base` may carry the `.enc` extension; it is stripped.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let mut base = base.into();
        if base.extension().and_then(|e| e.to_str()) == Some(CIPHERTEXT_EXT) {
            base.set_extension("");
        }
        Self {
            ciphertext: with_suffix(&base, CIPHERTEXT_EXT),
            metadata: with_suffix(&base, METADATA_EXT),
            signature: with_suffix(&base, SIGNATURE_EXT),
            base,
        }
    }

    /// File name the plaintext is restored under.
    pub fn plain_name(&self) -> Option<&std::ffi::OsStr> {
        self.base.file_name()
    }
}

fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

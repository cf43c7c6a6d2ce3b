//! Lazy vault tree listing.
//!
//! Shows directories and ciphertext objects only; sidecars and staging files
//! never appear. Enumeration is fail-fast: the first unreadable entry ends the
//! walk with an error, and an empty tree is reported as
//! [`TreeListing::Empty`] rather than as an empty iterator.

use crate::error::{VaultError, VaultResult, io_not_found};
use crate::paths::CIPHERTEXT_EXT;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const INDENT: &str = "     ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    Object,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    /// Nesting level; direct children of the listed root are at 0.
    pub depth: usize,
    pub kind: EntryKind,
    /// Directory name, or object name without the `.enc` extension.
    pub name: String,
    /// Path relative to the listed root; for objects, the name accepted by
    /// the download operations.
    pub path: PathBuf,
}

impl fmt::Display for TreeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            EntryKind::Directory => "[DIR]",
            EntryKind::Object => "[FILE]",
        };
        write!(f, "{}{label}: {}", INDENT.repeat(self.depth), self.name)
    }
}

pub enum TreeListing {
    Empty,
    Entries(TreeWalk),
}

impl TreeListing {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Drains the walk, stopping at the first enumeration error.
    pub fn collect_entries(self) -> VaultResult<Vec<TreeEntry>> {
        match self {
            Self::Empty => Ok(Vec::new()),
            Self::Entries(walk) => walk.collect(),
        }
    }
}

/// Depth-first walk, parents before children, siblings by file name.
pub struct TreeWalk {
    root: PathBuf,
    inner: walkdir::IntoIter,
    pending: Option<TreeEntry>,
    failed: bool,
}

impl TreeWalk {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            inner: WalkDir::new(root)
                .min_depth(1)
                .sort_by_file_name()
                .into_iter(),
            pending: None,
            failed: false,
        }
    }

    fn classify(&self, entry: &DirEntry) -> Option<TreeEntry> {
        let file_name = entry.file_name().to_str()?;
        if file_name.starts_with('.') {
            return None;
        }
        let relative = entry.path().strip_prefix(&self.root).ok()?;
        let depth = entry.depth() - 1;
        if entry.file_type().is_dir() {
            return Some(TreeEntry {
                depth,
                kind: EntryKind::Directory,
                name: file_name.to_string(),
                path: relative.to_path_buf(),
            });
        }
        let name = file_name.strip_suffix(&format!(".{CIPHERTEXT_EXT}"))?;
        if name.is_empty() {
            return None;
        }
        Some(TreeEntry {
            depth,
            kind: EntryKind::Object,
            name: name.to_string(),
            path: relative.with_file_name(name),
        })
    }
}

impl Iterator for TreeWalk {
    type Item = VaultResult<TreeEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(entry) = self.pending.take() {
            return Some(Ok(entry));
        }
        if self.failed {
            return None;
        }
        loop {
            match self.inner.next()? {
                Ok(entry) => {
                    if entry.file_type().is_dir()
                        && entry.file_name().to_string_lossy().starts_with('.')
                    {
                        self.inner.skip_current_dir();
                        continue;
                    }
                    if let Some(item) = self.classify(&entry) {
                        return Some(Ok(item));
                    }
                }
                Err(e) => {
                    self.failed = true;
                    let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                    return Some(Err(VaultError::Io(std::io::Error::other(format!(
                        "cannot enumerate {path}: {e}"
                    )))));
                }
            }
        }
    }
}

/// Lists `root`, distinguishing an empty tree from an unreadable one.
pub fn list_tree(root: &Path) -> VaultResult<TreeListing> {
    let meta = std::fs::metadata(root).map_err(|e| io_not_found(e, root.display()))?;
    if !meta.is_dir() {
        return Err(VaultError::Validation(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut walk = TreeWalk::new(root);
    match walk.next() {
        None => Ok(TreeListing::Empty),
        Some(Err(e)) => Err(e),
        Some(Ok(first)) => {
            walk.pending = Some(first);
            Ok(TreeListing::Entries(walk))
        }
    }
}

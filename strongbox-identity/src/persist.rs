//! Atomic file replacement for the identity files.

use crate::error::{IdentityError, IdentityResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes `bytes` to a temporary sibling and renames it over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> IdentityResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| IdentityError::Storage(e.to_string()))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| IdentityError::Storage(e.to_string()))?;
    tmp.write_all(bytes)
        .map_err(|e| IdentityError::Storage(e.to_string()))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| IdentityError::Storage(e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| IdentityError::Storage(format!("{}: {}", path.display(), e.error)))?;
    Ok(())
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> IdentityResult<()> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json)
}

/// Reads a JSON file. `Ok(None)` when the file does not exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> IdentityResult<Option<T>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(IdentityError::Storage(format!("{}: {e}", path.display()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("value.json");
        write_json(&path, &vec![1u32, 2, 3]).unwrap();
        let back: Option<Vec<u32>> = read_json(&path).unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));
    }

    #[test]
    fn missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let back: Option<Vec<u32>> = read_json(&dir.path().join("absent.json")).unwrap();
        assert!(back.is_none());
    }

    #[test]
    fn overwrite_leaves_no_temporaries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v.json");
        write_json(&path, &1u8).unwrap();
        write_json(&path, &2u8).unwrap();
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }
}

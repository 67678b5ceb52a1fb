//! Path utilities: root canonicalization and entry-name validation

use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};

/// Canonicalize a tree root (resolves symlinks, `..`, `.`).
///
/// Uses dunce so Windows roots stay free of the `\\?\` prefix.
pub fn canonicalize_root(path: &Path) -> Result<PathBuf, StorageError> {
    dunce::canonicalize(path).map_err(|e| StorageError::fs(path, e))
}

/// Check that a name is a single, plain path segment.
///
/// Names arrive in manifests and diffs from the other side of the wire and are
/// later joined onto a root, so anything that could escape it is refused.
pub fn validate_entry_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() {
        return Err(StorageError::InvalidPath("empty entry name".to_string()));
    }
    if name == "." || name == ".." {
        return Err(StorageError::InvalidPath(format!("reserved entry name {:?}", name)));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(StorageError::InvalidPath(format!(
            "entry name {:?} contains a separator or NUL",
            name
        )));
    }
    Ok(())
}

/// Validate a relative path taken from an archive entry.
///
/// Returns the path's segments; rejects absolute paths, prefixes and `..`.
pub fn relative_segments(path: &Path) -> Result<Vec<String>, StorageError> {
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    StorageError::InvalidPath(format!("non UTF-8 path {:?}", path))
                })?;
                validate_entry_name(part)?;
                segments.push(part.to_string());
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::InvalidPath(format!(
                    "path {:?} escapes the target root",
                    path
                )));
            }
        }
    }
    Ok(segments)
}

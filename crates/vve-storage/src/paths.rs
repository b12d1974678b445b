//! Path normalisation helpers used by the path authority.

use std::path::{Component, Path, PathBuf};

use crate::error::{StorageError, StorageResult};

/// Fold `.` and `..` segments without touching the filesystem.
///
/// Returns `None` when a `..` would climb above the filesystem root.
pub fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
            Component::Normal(segment) => {
                out.push(segment);
                depth += 1;
            }
        }
    }

    Some(out)
}

/// True when `path` lies strictly inside `dir`.
///
/// The comparison is component-wise, so `/out/abc2/x` is not inside
/// `/out/abc`, and `dir` itself is not inside `dir`.
pub fn is_strictly_within(path: &Path, dir: &Path) -> bool {
    path.strip_prefix(dir)
        .map(|rest| rest.components().next().is_some())
        .unwrap_or(false)
}

/// Canonicalise the deepest existing ancestor of `path` and re-append the
/// components that do not exist yet.
///
/// This resolves symlinks in every existing segment while still accepting
/// output locations that have not been created.
pub fn canonicalize_existing_prefix(path: &Path) -> StorageResult<PathBuf> {
    let mut existing = path;
    let mut missing: Vec<&std::ffi::OsStr> = Vec::new();

    loop {
        if existing.symlink_metadata().is_ok() {
            break;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => {
                return Err(StorageError::path_traversal(
                    "path has no existing ancestor",
                ))
            }
        }
    }

    let mut resolved = existing
        .canonicalize()
        .map_err(|_| StorageError::path_traversal("path cannot be resolved"))?;
    for name in missing.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

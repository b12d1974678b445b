//! Best-effort artifact removal.
//!
//! Cleanup never fails the caller: errors are logged and swallowed so they
//! cannot mask the outcome of the operation that triggered them.

use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

/// Remove a file, logging rather than returning failures.
///
/// Returns `true` if a file was removed.
pub async fn remove_file_best_effort(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Cleaned up file: {}", path.display());
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to cleanup file {}: {}", path.display(), e);
            false
        }
    }
}

/// Remove several files. Returns how many were removed.
pub async fn remove_files_best_effort<I, P>(paths: I) -> usize
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut removed = 0;
    for path in paths {
        if remove_file_best_effort(path).await {
            removed += 1;
        }
    }
    removed
}

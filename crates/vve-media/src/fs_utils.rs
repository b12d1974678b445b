//! Filesystem utilities for media artifacts.

use std::path::Path;
use tokio::fs;

use crate::error::MediaResult;

/// Create the parent directory of `path` if it does not exist.
pub async fn ensure_parent_dir(path: &Path) -> MediaResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Copy `src` to `dst` byte for byte.
///
/// The copy goes to a hidden sibling temp file that is renamed into place, so
/// `dst` never holds a partial file. The temp file is removed on failure and
/// when the returned future is dropped before finishing.
pub async fn copy_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<u64> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    ensure_parent_dir(dst).await?;

    let result = async {
        let dir = match dst.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let staged = tempfile::Builder::new()
            .prefix(".")
            .suffix(".partial")
            .tempfile_in(dir)?;
        let bytes = fs::copy(src, staged.path()).await?;
        staged.persist(dst).map_err(|e| e.error)?;
        Ok::<_, std::io::Error>(bytes)
    }
    .await;

    match result {
        Ok(bytes) => {
            tracing::debug!("Copied {} bytes: {} -> {}", bytes, src.display(), dst.display());
            Ok(bytes)
        }
        Err(e) => {
            tracing::error!(
                "Failed to copy file: {} -> {}: {}",
                src.display(),
                dst.display(),
                e
            );
            Err(e.into())
        }
    }
}

//! Per-session directory layout and path authority.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use vve_models::{ClipIndex, SessionId};

use crate::error::{StorageError, StorageResult};
use crate::paths::{canonicalize_existing_prefix, is_strictly_within, normalize_lexically};

/// Subdirectory holding normalized clips.
pub const COMPRESSED_DIR_NAME: &str = "compressed";

/// File name of the concatenated session video.
pub const CONCATENATED_FILE_NAME: &str = "final.mp4";

/// Owner of the output directory tree.
///
/// Layout:
/// ```text
/// <root>/<session>/compressed/<index>.mp4
/// <root>/<session>/final.mp4
/// ```
///
/// Writes for one session are not serialized here; callers must not run
/// overlapping compress/concat requests for the same session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Open (and create if missing) the output root.
    pub fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let root = root.canonicalize()?;
        debug!("Session store rooted at {}", root.display());
        Ok(Self { root })
    }

    /// Canonical output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory owned by a session.
    pub fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.root.join(session.as_str())
    }

    pub fn compressed_dir(&self, session: &SessionId) -> PathBuf {
        self.session_dir(session).join(COMPRESSED_DIR_NAME)
    }

    /// Location of the normalized clip for `index`.
    pub fn normalized_path(&self, session: &SessionId, index: ClipIndex) -> PathBuf {
        self.compressed_dir(session)
            .join(format!("{}.mp4", index.value()))
    }

    /// Location of the concatenated session video.
    pub fn concatenated_path(&self, session: &SessionId) -> PathBuf {
        self.session_dir(session).join(CONCATENATED_FILE_NAME)
    }

    /// Create the session directory tree.
    pub async fn ensure_session_dirs(&self, session: &SessionId) -> StorageResult<()> {
        tokio::fs::create_dir_all(self.compressed_dir(session)).await?;
        Ok(())
    }

    /// Resolve a caller-supplied path and require it to lie strictly inside the
    /// session directory.
    ///
    /// Relative paths are taken relative to the session directory. The lexical
    /// check runs before any filesystem access; the symlink-resolving check
    /// runs second so a link inside the session cannot point outside it.
    pub fn resolve_within(
        &self,
        candidate: impl AsRef<Path>,
        session: &SessionId,
    ) -> StorageResult<PathBuf> {
        let candidate = candidate.as_ref();

        if candidate.as_os_str().is_empty() {
            return Err(StorageError::path_traversal("empty path"));
        }
        if candidate.to_string_lossy().contains('\0') {
            return Err(StorageError::path_traversal("path contains NUL byte"));
        }

        let dir = self.session_dir(session);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            dir.join(candidate)
        };

        let lexical = normalize_lexically(&joined)
            .ok_or_else(|| StorageError::path_traversal("path climbs above the filesystem root"))?;
        if !is_strictly_within(&lexical, &dir) {
            return Err(StorageError::path_traversal("path is outside the session directory"));
        }

        let resolved = canonicalize_existing_prefix(&lexical)?;
        if !is_strictly_within(&resolved, &dir) {
            warn!(
                session_id = %session,
                "Rejected path resolving outside its session directory"
            );
            return Err(StorageError::path_traversal(
                "path resolves outside the session directory",
            ));
        }

        Ok(resolved)
    }

    /// Whether a regular file exists at `path`. Absence is not an error.
    pub fn file_exists(path: impl AsRef<Path>) -> bool {
        path.as_ref().is_file()
    }

    /// Path of `path` relative to the session directory, for display.
    pub fn relative_name(&self, path: &Path, session: &SessionId) -> Option<String> {
        path.strip_prefix(self.session_dir(session))
            .ok()
            .map(|rest| rest.to_string_lossy().to_string())
    }
}

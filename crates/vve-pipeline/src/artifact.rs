//! Ownership of the files a request creates.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};
use vve_storage::remove_file_best_effort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Spooled upload in the temp directory
    Uploaded,
    /// `<session>/compressed/<index>.mp4`
    Normalized,
    /// `<session>/final.mp4`
    Concatenated,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Uploaded => "uploaded",
            ArtifactKind::Normalized => "normalized",
            ArtifactKind::Concatenated => "concatenated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

/// Artifacts created by one request that must not outlive a failure.
///
/// Whatever is still recorded when the ledger drops is deleted, so an
/// abandoned request leaves no partial outputs behind.
#[derive(Debug, Default)]
pub struct ArtifactLedger {
    artifacts: Vec<MediaArtifact>,
}

impl ArtifactLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an artifact immediately before it is written.
    ///
    /// Anything already at `path` is deleted if the request fails.
    pub fn record(&mut self, kind: ArtifactKind, path: impl Into<PathBuf>) {
        self.artifacts.push(MediaArtifact {
            kind,
            path: path.into(),
        });
    }

    pub fn artifacts(&self) -> &[MediaArtifact] {
        &self.artifacts
    }

    pub fn paths_of(&self, kind: ArtifactKind) -> Vec<PathBuf> {
        self.artifacts
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| a.path.clone())
            .collect()
    }

    /// Stop tracking everything; the request succeeded.
    pub fn commit(&mut self) {
        self.artifacts.clear();
    }

    /// Delete every recorded artifact. Returns how many files were removed.
    pub async fn remove_all(&mut self) -> usize {
        let mut removed = 0;
        // Each entry stays recorded until its removal finishes.
        while let Some(artifact) = self.artifacts.last() {
            if remove_file_best_effort(&artifact.path).await {
                removed += 1;
            }
            self.artifacts.pop();
        }
        removed
    }
}

impl Drop for ArtifactLedger {
    fn drop(&mut self) {
        for artifact in self.artifacts.drain(..) {
            match std::fs::remove_file(&artifact.path) {
                Ok(()) => debug!(
                    kind = artifact.kind.as_str(),
                    "Removed abandoned artifact {}",
                    artifact.path.display()
                ),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    kind = artifact.kind.as_str(),
                    "Failed to remove abandoned artifact {}: {}",
                    artifact.path.display(),
                    e
                ),
            }
        }
    }
}

/// An uploaded file in the temp directory.
///
/// Deleted exactly once: by [`TempUpload::discard`], or on drop if the
/// owning future never got that far.
#[derive(Debug)]
pub struct TempUpload {
    path: Option<PathBuf>,
}

impl TempUpload {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new(""))
    }

    /// Delete the file now. Returns `true` if a file was removed.
    pub async fn discard(mut self) -> bool {
        match self.path.take() {
            Some(path) => remove_file_best_effort(&path).await,
            None => false,
        }
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed abandoned upload {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove abandoned upload {}: {}", path.display(), e),
            }
        }
    }
}

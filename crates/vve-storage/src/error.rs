//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Path escapes the session directory: {0}")]
    PathTraversal(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn path_traversal(reason: impl Into<String>) -> Self {
        Self::PathTraversal(reason.into())
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Check if this is a path authority rejection.
    pub fn is_path_traversal(&self) -> bool {
        matches!(self, StorageError::PathTraversal(_))
    }
}

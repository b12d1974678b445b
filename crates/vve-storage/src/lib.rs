//! Session-scoped media storage.
//!
//! This crate provides:
//! - Per-session directory layout under a single output root
//! - Path authority: validation that caller-supplied paths stay inside a session
//! - Best-effort artifact cleanup

pub mod cleanup;
pub mod error;
pub mod paths;
pub mod session_store;

pub use cleanup::{remove_file_best_effort, remove_files_best_effort};
pub use error::{StorageError, StorageResult};
pub use session_store::{SessionStore, CONCATENATED_FILE_NAME, COMPRESSED_DIR_NAME};

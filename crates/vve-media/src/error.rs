//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Pipeline step an FFmpeg failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaStage {
    Transcode,
    Concat,
}

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFprobe failed: {0}")]
    ProbeFailed(String),

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Transcode failed: {message}")]
    TranscodeFailed {
        message: String,
        exit_code: Option<i32>,
        retryable: bool,
    },

    #[error("Concatenation failed: {message}")]
    ConcatFailed {
        message: String,
        exit_code: Option<i32>,
        retryable: bool,
    },

    #[error("At least one input is required")]
    InsufficientInputs,

    #[error("Inputs have incompatible streams: {0}")]
    IncompatibleStreams(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn probe_failed(message: impl Into<String>) -> Self {
        Self::ProbeFailed(message.into())
    }

    /// Attribute a process-level failure to a pipeline step.
    ///
    /// Domain errors that already carry their own meaning (probe failures,
    /// incompatible inputs, cancellation) pass through unchanged.
    pub fn in_stage(self, stage: MediaStage) -> Self {
        let (message, exit_code, retryable) = match self {
            MediaError::FfmpegFailed {
                message, exit_code, ..
            } => (message, exit_code, false),
            MediaError::FfmpegNotFound => ("FFmpeg not available".to_string(), None, false),
            MediaError::Timeout(secs) => (format!("timed out after {secs} seconds"), None, true),
            MediaError::Io(e) => (format!("IO error: {e}"), None, true),
            other => return other,
        };

        match stage {
            MediaStage::Transcode => MediaError::TranscodeFailed {
                message,
                exit_code,
                retryable,
            },
            MediaStage::Concat => MediaError::ConcatFailed {
                message,
                exit_code,
                retryable,
            },
        }
    }

    /// Exit code of the external process, when it exited on its own.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            MediaError::FfmpegFailed { exit_code, .. }
            | MediaError::TranscodeFailed { exit_code, .. }
            | MediaError::ConcatFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

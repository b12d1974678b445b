//! Uniform terminal error of the pipeline.
//!
//! Every component error converts into a [`PipelineError`] with a stable
//! [`ErrorKind`] and a caller-facing message. Messages never carry
//! filesystem paths or process output; those go to `detail`, which is only
//! logged.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use vve_analysis::AnalysisError;
use vve_media::MediaError;
use vve_models::IdError;
use vve_storage::StorageError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error taxonomy shared by every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PathTraversal,
    InvalidInput,
    NotFound,
    ProbeFailed,
    TranscodeFailed,
    ConcatFailed,
    InsufficientInputs,
    IncompatibleStreams,
    RemoteProcessingFailed,
    InvalidAnalysisResponse,
    Cancelled,
    Unknown,
}

/// Whether the caller or the server is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    ClientFault,
    ServerFault,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PathTraversal => "path_traversal",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ProbeFailed => "probe_failed",
            ErrorKind::TranscodeFailed => "transcode_failed",
            ErrorKind::ConcatFailed => "concat_failed",
            ErrorKind::InsufficientInputs => "insufficient_inputs",
            ErrorKind::IncompatibleStreams => "incompatible_streams",
            ErrorKind::RemoteProcessingFailed => "remote_processing_failed",
            ErrorKind::InvalidAnalysisResponse => "invalid_analysis_response",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unknown => "unknown",
        }
    }

    pub fn status_class(&self) -> StatusClass {
        match self {
            ErrorKind::PathTraversal
            | ErrorKind::InvalidInput
            | ErrorKind::NotFound
            | ErrorKind::InsufficientInputs
            | ErrorKind::IncompatibleStreams => StatusClass::ClientFault,
            _ => StatusClass::ServerFault,
        }
    }

    /// HTTP status used at the boundary.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            _ => match self.status_class() {
                StatusClass::ClientFault => 400,
                StatusClass::ServerFault => 500,
            },
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineError {
    pub kind: ErrorKind,
    /// Safe to show to the caller
    pub message: String,
    pub retryable: bool,
    /// Server-side diagnostics, never sent to the caller
    pub detail: Option<String>,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: false,
            detail: None,
        }
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, msg)
    }

    pub fn insufficient_inputs(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientInputs, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }

    pub fn path_traversal() -> Self {
        Self::new(
            ErrorKind::PathTraversal,
            "Invalid video path: path must be within the game output directory",
        )
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "Request was cancelled").retryable(true)
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, msg)
    }

    pub fn status_class(&self) -> StatusClass {
        self.kind.status_class()
    }

    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }
}

impl From<IdError> for PipelineError {
    fn from(e: IdError) -> Self {
        Self::invalid_input(e.to_string())
    }
}

impl From<StorageError> for PipelineError {
    fn from(e: StorageError) -> Self {
        let detail = e.to_string();
        let error = match e {
            StorageError::PathTraversal(_) => Self::path_traversal(),
            StorageError::NotFound(_) => Self::not_found("Video file not found"),
            StorageError::Io(_) => Self::unknown("Storage operation failed").retryable(true),
        };
        error.with_detail(detail)
    }
}

impl From<MediaError> for PipelineError {
    fn from(e: MediaError) -> Self {
        let detail = e.to_string();
        let error = match e {
            MediaError::ProbeFailed(_) | MediaError::JsonParse(_) => {
                Self::new(ErrorKind::ProbeFailed, "Failed to read video metadata")
            }
            MediaError::TranscodeFailed { retryable, .. } => {
                Self::new(ErrorKind::TranscodeFailed, "Failed to compress video").retryable(retryable)
            }
            MediaError::ConcatFailed { retryable, .. } => {
                Self::new(ErrorKind::ConcatFailed, "Failed to concatenate videos").retryable(retryable)
            }
            MediaError::InsufficientInputs => {
                Self::insufficient_inputs("No videos provided for concatenation")
            }
            MediaError::IncompatibleStreams(reason) => Self::new(
                ErrorKind::IncompatibleStreams,
                format!("Videos must share resolution and frame rate: {reason}"),
            ),
            MediaError::FileNotFound(_) => Self::not_found("Video file not found"),
            MediaError::Cancelled => Self::cancelled(),
            MediaError::FfmpegNotFound | MediaError::FfprobeNotFound => {
                Self::unknown("Video tools are unavailable")
            }
            MediaError::FfmpegFailed { .. } => Self::unknown("Video processing failed"),
            MediaError::Timeout(_) | MediaError::Io(_) => {
                Self::unknown("Video processing failed").retryable(true)
            }
        };
        error.with_detail(detail)
    }
}

impl From<AnalysisError> for PipelineError {
    fn from(e: AnalysisError) -> Self {
        let detail = e.to_string();
        let error = match e {
            AnalysisError::RemoteProcessingFailed { retryable, .. } => {
                Self::new(ErrorKind::RemoteProcessingFailed, "Video analysis failed").retryable(retryable)
            }
            AnalysisError::InvalidResponse(_) => Self::new(
                ErrorKind::InvalidAnalysisResponse,
                "Video analysis returned an invalid response",
            ),
            AnalysisError::Cancelled => Self::cancelled(),
            AnalysisError::ConfigError(_) => Self::unknown("Video analysis is not configured"),
            AnalysisError::Io(_) => Self::unknown("Video analysis failed").retryable(true),
        };
        error.with_detail(detail)
    }
}

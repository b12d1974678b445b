//! Analysis client error types.

use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The remote engine failed, refused, or did not finish in time.
    #[error("Remote processing failed: {message}")]
    RemoteProcessingFailed { message: String, retryable: bool },

    /// The engine answered, but not with a valid event list.
    #[error("Invalid analysis response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn remote_failed(msg: impl Into<String>, retryable: bool) -> Self {
        Self::RemoteProcessingFailed {
            message: msg.into(),
            retryable,
        }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Error for a non-success HTTP status from the engine.
    ///
    /// Rate limiting and server errors are transient; other statuses are not.
    pub fn from_status(context: &str, status: reqwest::StatusCode) -> Self {
        let retryable = status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
        Self::remote_failed(format!("{context} returned {status}"), retryable)
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            AnalysisError::RemoteProcessingFailed { retryable, .. } => *retryable,
            AnalysisError::Cancelled | AnalysisError::Io(_) => true,
            AnalysisError::InvalidResponse(_) | AnalysisError::ConfigError(_) => false,
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return Self::invalid_response(format!("undecodable body: {e}"));
        }
        match e.status() {
            Some(status) => Self::from_status("Gemini API", status),
            None => Self::remote_failed(format!("request failed: {e}"), true),
        }
    }
}

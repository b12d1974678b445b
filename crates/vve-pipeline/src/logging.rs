//! Structured session logging utilities.

use tracing::{error, info, warn, Span};
use vve_models::SessionId;

/// Logger carrying the session id and operation on every record.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    session_id: String,
    operation: &'static str,
}

impl SessionLogger {
    /// Create a new logger for a session and operation
    /// (e.g. "compress", "concat", "events", "process").
    pub fn new(session_id: &SessionId, operation: &'static str) -> Self {
        Self {
            session_id: session_id.to_string(),
            operation,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = self.operation,
            "Pipeline started: {}", message
        );
    }

    pub fn log_stage(&self, stage: &str) {
        info!(
            session_id = %self.session_id,
            operation = self.operation,
            stage,
            "Pipeline stage: {}", stage
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            session_id = %self.session_id,
            operation = self.operation,
            "Pipeline warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            session_id = %self.session_id,
            operation = self.operation,
            "Pipeline error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            session_id = %self.session_id,
            operation = self.operation,
            "Pipeline completed: {}", message
        );
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Span for attaching the session context to nested work.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "session",
            session_id = %self.session_id,
            operation = self.operation
        )
    }
}

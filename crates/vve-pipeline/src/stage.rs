//! Per-request stage machine.
//!
//! ```text
//! Uploading -> Probing -> (Copying | Transcoding) -> [Concatenating] -> Analyzing -> Cleaning -> Done
//! ```
//! Operations that cover only part of the flow enter at a later stage.
//! `Errored` is reachable from every non-terminal stage.

use std::fmt;

use metrics::counter;
use serde::Serialize;

use crate::error::PipelineError;
use crate::logging::SessionLogger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Uploading,
    Probing,
    Copying,
    Transcoding,
    Concatenating,
    Analyzing,
    Cleaning,
    Done,
    Errored,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Uploading => "uploading",
            PipelineStage::Probing => "probing",
            PipelineStage::Copying => "copying",
            PipelineStage::Transcoding => "transcoding",
            PipelineStage::Concatenating => "concatenating",
            PipelineStage::Analyzing => "analyzing",
            PipelineStage::Cleaning => "cleaning",
            PipelineStage::Done => "done",
            PipelineStage::Errored => "errored",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Errored)
    }

    /// Whether `next` may follow `self`.
    pub fn can_advance_to(&self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        if self.is_terminal() {
            return false;
        }
        match next {
            Errored => true,
            Probing => matches!(self, Uploading),
            // A run with both small and large clips copies some and transcodes others.
            Copying | Transcoding => matches!(self, Probing | Copying | Transcoding),
            Concatenating => matches!(self, Uploading | Copying | Transcoding),
            Analyzing => matches!(self, Uploading | Concatenating),
            Cleaning => matches!(self, Copying | Transcoding | Concatenating | Analyzing),
            Done => matches!(self, Cleaning),
            Uploading => false,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records the stages one request passes through.
#[derive(Debug)]
pub struct StageTracker {
    history: Vec<PipelineStage>,
    logger: SessionLogger,
}

impl StageTracker {
    /// Start a request in [`PipelineStage::Uploading`].
    pub fn new(logger: SessionLogger) -> Self {
        logger.log_stage(PipelineStage::Uploading.as_str());
        Self {
            history: vec![PipelineStage::Uploading],
            logger,
        }
    }

    pub fn current(&self) -> PipelineStage {
        self.history
            .last()
            .copied()
            .unwrap_or(PipelineStage::Uploading)
    }

    /// Move to `next`. Illegal transitions are logged and still recorded.
    pub fn enter(&mut self, next: PipelineStage) {
        let current = self.current();
        if !current.can_advance_to(next) {
            self.logger
                .log_warning(&format!("unexpected stage transition {current} -> {next}"));
        }
        self.logger.log_stage(next.as_str());
        self.history.push(next);
    }

    /// Move to [`PipelineStage::Errored`], recording the failure.
    pub fn fail(&mut self, error: &PipelineError) {
        let failed_in = self.current();
        counter!(
            "vve_pipeline_failures_total",
            "operation" => self.logger.operation(),
            "stage" => failed_in.as_str(),
            "kind" => error.kind.as_str()
        )
        .increment(1);

        self.logger.log_error(&format!(
            "{} failed during {}: {} ({})",
            self.logger.operation(),
            failed_in,
            error.message,
            error.detail.as_deref().unwrap_or("no detail")
        ));
        self.history.push(PipelineStage::Errored);
    }

    pub fn history(&self) -> &[PipelineStage] {
        &self.history
    }

    pub fn logger(&self) -> &SessionLogger {
        &self.logger
    }

    /// Stage names, for responses.
    pub fn names(&self) -> Vec<String> {
        self.history.iter().map(|s| s.as_str().to_string()).collect()
    }
}

//! Volleyball video pipeline orchestration.
//!
//! This crate provides:
//! - The orchestrator for compress, concat, events and full runs
//! - Per-request stage tracking and artifact cleanup
//! - The uniform pipeline error taxonomy
//! - Session-scoped structured logging

pub mod artifact;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod stage;

pub use artifact::{ArtifactKind, ArtifactLedger, MediaArtifact, TempUpload};
pub use config::PipelineConfig;
pub use error::{ErrorKind, PipelineError, PipelineResult, StatusClass};
pub use logging::SessionLogger;
pub use orchestrator::{
    CompressOutcome, ConcatClipsOutcome, EventsOutcome, Orchestrator, PipelineOutcome,
};
pub use stage::{PipelineStage, StageTracker};

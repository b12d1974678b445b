//! Shared data models for the volleyball video pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Session identifiers and clip indices
//! - Game events returned by the analysis engine, and their output schema
//! - Probed video metadata
//! - HTTP request/response payloads

pub mod api;
pub mod event;
pub mod session;
pub mod video;

// Re-export common types
pub use api::{
    CompressVideoResponse, ConcatVideoRequest, ConcatVideoResponse, GameEventsResponse,
    NewGameIdResponse, ProcessGameResponse, ProducedArtifact,
};
pub use event::{event_output_schema, EventType, EventValidationError, GameEvent};
pub use session::{ClipIndex, IdError, SessionId, MAX_CLIP_INDEX};
pub use video::VideoMetadata;

//! Remote video analysis for game event extraction.
//!
//! - [`AnalysisEngine`]: media + schema + prompt in, raw JSON out
//! - [`GeminiClient`]: the Gemini Files + generateContent implementation
//! - [`EventExtractor`]: parses and validates the answer into [`vve_models::GameEvent`]s

pub mod engine;
pub mod error;
pub mod extractor;
pub mod gemini;
pub mod schema;

pub use engine::AnalysisEngine;
pub use error::{AnalysisError, AnalysisResult};
pub use extractor::{parse_events, EventExtractor, EVENT_EXTRACTION_PROMPT};
pub use gemini::{GeminiClient, GeminiConfig};
pub use schema::to_gemini_schema;

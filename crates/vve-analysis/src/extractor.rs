//! Game event extraction on top of an [`AnalysisEngine`].

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use schemars::schema::RootSchema;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vve_models::{event_output_schema, GameEvent};

use crate::engine::AnalysisEngine;
use crate::error::{AnalysisError, AnalysisResult};

/// Fixed instruction sent with every video.
pub const EVENT_EXTRACTION_PROMPT: &str = "Analyze the volleyball game video and extract all game events \
including serves, rally starts, rally ends, and points won. For each event report its type, \
the timestamp in seconds from the start of the video, and your confidence between 0 and 1.";

/// Runs event extraction and enforces the event invariants on the answer.
#[derive(Clone)]
pub struct EventExtractor {
    engine: Arc<dyn AnalysisEngine>,
    schema: RootSchema,
}

impl EventExtractor {
    pub fn new(engine: Arc<dyn AnalysisEngine>) -> Self {
        Self {
            engine,
            schema: event_output_schema(),
        }
    }

    /// Analyse `media` and return its events in the order the engine gave them.
    ///
    /// A response with any invalid event is rejected as a whole.
    pub async fn extract_events(
        &self,
        media: &Path,
        cancel: &CancellationToken,
    ) -> AnalysisResult<Vec<GameEvent>> {
        let start = Instant::now();
        let result = async {
            let raw = self
                .engine
                .generate(media, &self.schema, EVENT_EXTRACTION_PROMPT, cancel)
                .await?;
            parse_events(&raw)
        }
        .await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        histogram!("vve_analysis_duration_seconds", "outcome" => outcome)
            .record(start.elapsed().as_secs_f64());

        match &result {
            Ok(events) => info!(count = events.len(), "Extracted game events"),
            Err(e) => warn!("Event extraction failed: {}", e),
        }
        result
    }
}

/// Parse and validate the engine's raw answer.
pub fn parse_events(raw: &str) -> AnalysisResult<Vec<GameEvent>> {
    let text = strip_code_fences(raw);

    let events: Vec<GameEvent> = serde_json::from_str(text)
        .map_err(|e| AnalysisError::invalid_response(format!("not a list of game events: {e}")))?;

    for (i, event) in events.iter().enumerate() {
        event
            .validate()
            .map_err(|e| AnalysisError::invalid_response(format!("event {i}: {e}")))?;
    }

    Ok(events)
}

/// Drop a surrounding markdown code block (```json ... ```), if any.
fn strip_code_fences(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Skip the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

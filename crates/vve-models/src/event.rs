//! Game events extracted from match footage.

use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind of event the analysis engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Serve,
    RallyStart,
    RallyEnd,
    PointWon,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Serve,
        EventType::RallyStart,
        EventType::RallyEnd,
        EventType::PointWon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Serve => "serve",
            EventType::RallyStart => "rally_start",
            EventType::RallyEnd => "rally_end",
            EventType::PointWon => "point_won",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A timestamped event in the analysed video.
///
/// Ordering of a response is whatever the engine returned; callers sort by
/// `timestamp` if they need chronological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GameEvent {
    /// Type of the game event.
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Seconds from the start of the video at which the event occurs.
    #[schemars(range(min = 0.0))]
    pub timestamp: f64,

    /// Confidence of the detection, from 0 to 1.
    #[schemars(range(min = 0.0, max = 1.0))]
    pub confidence: f64,
}

/// A field constraint violated by a [`GameEvent`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventValidationError {
    #[error("timestamp must be a finite number >= 0, got {0}")]
    InvalidTimestamp(f64),

    #[error("confidence must be within [0, 1], got {0}")]
    InvalidConfidence(f64),
}

impl GameEvent {
    pub fn new(event_type: EventType, timestamp: f64, confidence: f64) -> Self {
        Self {
            event_type,
            timestamp,
            confidence,
        }
    }

    /// Check the field constraints.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if !self.timestamp.is_finite() || self.timestamp < 0.0 {
            return Err(EventValidationError::InvalidTimestamp(self.timestamp));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(EventValidationError::InvalidConfidence(self.confidence));
        }
        Ok(())
    }
}

/// JSON schema of the analysis output: an array of [`GameEvent`].
///
/// This is the single source of truth for the response shape; remote engines
/// receive a translation of it.
pub fn event_output_schema() -> RootSchema {
    schemars::schema_for!(Vec<GameEvent>)
}

//! HTTP request and response payloads.
//!
//! Field names follow the camelCase wire format the web client expects.

use serde::{Deserialize, Serialize};

use crate::event::GameEvent;
use crate::video::VideoMetadata;

/// `GET /newGameId`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGameIdResponse {
    pub game_id: String,
}

/// `POST /compress/{sessionId}/{clipIndex}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressVideoResponse {
    pub message: String,
    pub compressed_video_url: String,
}

/// `POST /concat/{sessionId}` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcatVideoRequest {
    #[serde(default)]
    pub videos: Vec<String>,
}

/// `POST /concat/{sessionId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcatVideoResponse {
    pub message: String,
    pub concatenated_video_url: String,
}

/// `GET /events`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEventsResponse {
    pub message: String,
    pub events: Vec<GameEvent>,
}

/// An artifact produced while processing a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducedArtifact {
    /// `normalized` or `concatenated`
    pub kind: String,
    /// File name relative to the session directory
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VideoMetadata>,
    /// Whether a byte copy was used instead of a transcode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copied: Option<bool>,
}

/// `POST /process/{sessionId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessGameResponse {
    pub message: String,
    pub events: Vec<GameEvent>,
    pub artifacts: Vec<ProducedArtifact>,
    pub stages: Vec<String>,
}

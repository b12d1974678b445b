//! Probed video metadata.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Stream properties of a media file, derived once by the prober.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frames per second, rounded to an integer
    pub fps: u32,
    /// Container duration in seconds, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl VideoMetadata {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps,
            duration_secs: None,
        }
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Whether the stream already fits within the given bounds.
    pub fn fits_within(&self, max_width: u32, max_fps: u32) -> bool {
        self.width <= max_width && self.fps <= max_fps
    }

    /// Whether two streams can be joined without re-encoding.
    pub fn same_stream_shape(&self, other: &VideoMetadata) -> bool {
        self.width == other.width && self.height == other.height && self.fps == other.fps
    }
}

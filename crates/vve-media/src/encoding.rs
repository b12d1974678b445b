//! Normalization targets and encoder settings.

use serde::{Deserialize, Serialize};
use vve_models::VideoMetadata;

/// Default normalization width in pixels.
pub const DEFAULT_TARGET_WIDTH: u32 = 1280;
/// Default normalization frame rate.
pub const DEFAULT_TARGET_FPS: u32 = 24;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "veryfast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;
/// Default pixel format, widely playable
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// Upper bounds a normalized clip must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeTarget {
    pub width: u32,
    pub fps: u32,
}

impl Default for NormalizeTarget {
    fn default() -> Self {
        Self {
            width: DEFAULT_TARGET_WIDTH,
            fps: DEFAULT_TARGET_FPS,
        }
    }
}

/// Video encoder configuration for re-encoded clips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "veryfast", "medium")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            preset: default_preset(),
            crf: default_crf(),
            pixel_format: default_pixel_format(),
        }
    }
}

/// Concrete parameters for one re-encode.
#[derive(Debug, Clone)]
pub struct TranscodePlan {
    /// Output width; height follows the aspect ratio
    pub width: u32,
    /// Output frame rate
    pub fps: u32,
    pub encoding: EncodingConfig,
}

impl TranscodePlan {
    /// Plan a re-encode that never upscales and never raises the frame rate.
    pub fn for_source(source: &VideoMetadata, target: NormalizeTarget, encoding: EncodingConfig) -> Self {
        Self {
            width: source.width.min(target.width),
            fps: source.fps.min(target.fps),
            encoding,
        }
    }

    /// FFmpeg video filter chain. `-2` keeps the height even for H.264.
    pub fn video_filter(&self) -> String {
        format!("scale={}:-2,fps={}", self.width, self.fps)
    }
}

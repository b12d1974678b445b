//! Pipeline configuration.

use std::path::PathBuf;

use vve_media::encoding::{DEFAULT_TARGET_FPS, DEFAULT_TARGET_WIDTH};
use vve_media::NormalizeTarget;

pub use vve_media::toolkit::DEFAULT_FFMPEG_TIMEOUT_SECS;

/// Default root for produced artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = "/tmp/volleyball-output";


/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Normalization bounds
    pub target: NormalizeTarget,
    /// Root of the per-session output tree
    pub output_dir: PathBuf,
    /// Where uploads are spooled before processing
    pub upload_temp_dir: PathBuf,
    /// Limit for a single FFmpeg run
    pub ffmpeg_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target: NormalizeTarget::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            upload_temp_dir: default_upload_temp_dir(),
            ffmpeg_timeout_secs: DEFAULT_FFMPEG_TIMEOUT_SECS,
        }
    }
}

fn default_upload_temp_dir() -> PathBuf {
    std::env::temp_dir().join("volleyball-video-editor")
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            target: NormalizeTarget {
                width: std::env::var("TARGET_WIDTH")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|w| *w > 0)
                    .unwrap_or(DEFAULT_TARGET_WIDTH),
                fps: std::env::var("TARGET_FPS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|f| *f > 0)
                    .unwrap_or(DEFAULT_TARGET_FPS),
            },
            output_dir: std::env::var("OUTPUT_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            upload_temp_dir: std::env::var("UPLOAD_TEMP_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(default_upload_temp_dir),
            ffmpeg_timeout_secs: std::env::var("FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_FFMPEG_TIMEOUT_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 5] = [
        "TARGET_WIDTH",
        "TARGET_FPS",
        "OUTPUT_DIR",
        "UPLOAD_TEMP_DIR",
        "FFMPEG_TIMEOUT_SECS",
    ];

    fn clear() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        let config = PipelineConfig::from_env();
        assert_eq!(config.target, NormalizeTarget { width: 1280, fps: 24 });
        assert_eq!(config.output_dir, PathBuf::from("/tmp/volleyball-output"));
        assert!(config.upload_temp_dir.ends_with("volleyball-video-editor"));
        assert_eq!(config.ffmpeg_timeout_secs, 3600);
    }

    #[test]
    #[serial]
    fn test_overrides_and_invalid_values() {
        clear();
        std::env::set_var("TARGET_WIDTH", "640");
        std::env::set_var("TARGET_FPS", "0");
        std::env::set_var("OUTPUT_DIR", "/data/out");
        std::env::set_var("FFMPEG_TIMEOUT_SECS", "abc");

        let config = PipelineConfig::from_env();
        assert_eq!(config.target.width, 640);
        assert_eq!(config.target.fps, 24);
        assert_eq!(config.output_dir, PathBuf::from("/data/out"));
        assert_eq!(config.ffmpeg_timeout_secs, 3600);
        clear();
    }
}

//! External media tooling as an injectable capability.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vve_models::VideoMetadata;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::encoding::TranscodePlan;
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video;

/// Default limit for a single FFmpeg invocation.
pub const DEFAULT_FFMPEG_TIMEOUT_SECS: u64 = 3600;

/// Prober, transcoder and concatenator behind one interface.
///
/// Implementations only run the external work; the normalize-or-copy policy
/// and artifact cleanup live in [`crate::TranscodeEngine`].
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Report the stream properties of `path`.
    async fn probe(&self, path: &Path, cancel: &CancellationToken) -> MediaResult<VideoMetadata>;

    /// Re-encode `input` into `output` following `plan`.
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        plan: &TranscodePlan,
        cancel: &CancellationToken,
    ) -> MediaResult<()>;

    /// Join `inputs` in order into `output` without re-encoding.
    async fn concat(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        cancel: &CancellationToken,
    ) -> MediaResult<()>;
}

/// [`MediaToolkit`] backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    timeout_secs: u64,
}

impl Default for FfmpegToolkit {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG_TIMEOUT_SECS)
    }
}

impl FfmpegToolkit {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    fn runner(&self, cancel: &CancellationToken, operation: &'static str) -> FfmpegRunner {
        FfmpegRunner::new()
            .with_cancel(cancel.clone())
            .with_timeout(self.timeout_secs)
            .with_operation(operation)
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe(&self, path: &Path, cancel: &CancellationToken) -> MediaResult<VideoMetadata> {
        probe_video(path, cancel).await
    }

    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        plan: &TranscodePlan,
        cancel: &CancellationToken,
    ) -> MediaResult<()> {
        let cmd = FfmpegCommand::new(input, output)
            .video_filter(plan.video_filter())
            .video_codec(&plan.encoding.codec)
            .preset(&plan.encoding.preset)
            .crf(plan.encoding.crf)
            .pixel_format(&plan.encoding.pixel_format)
            .audio_codec("copy")
            .faststart();

        self.runner(cancel, "transcode").run(&cmd).await
    }

    async fn concat(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        cancel: &CancellationToken,
    ) -> MediaResult<()> {
        if inputs.is_empty() {
            return Err(MediaError::InsufficientInputs);
        }

        // The list file lives in its own temp dir and is dropped with it.
        let list_dir = tempfile::TempDir::new()?;
        let list_path = list_dir.path().join("inputs.txt");
        tokio::fs::write(&list_path, concat_list(inputs)).await?;
        debug!("Concat list with {} entries at {}", inputs.len(), list_path.display());

        let cmd = FfmpegCommand::new(&list_path, output)
            .concat_demuxer()
            .codec_copy()
            .faststart();

        self.runner(cancel, "concat").run(&cmd).await
    }
}

/// Render the concat demuxer list file.
///
/// Each entry is single-quoted; embedded quotes become `'\''`.
pub fn concat_list(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|path| {
            let escaped = path.to_string_lossy().replace('\'', r"'\''");
            format!("file '{escaped}'\n")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_list_preserves_order_and_escapes_quotes() {
        let inputs = vec![
            PathBuf::from("/out/s/compressed/0.mp4"),
            PathBuf::from("/out/s/compressed/it's.mp4"),
            PathBuf::from("/out/s/compressed/1.mp4"),
        ];
        assert_eq!(
            concat_list(&inputs),
            "file '/out/s/compressed/0.mp4'\n\
             file '/out/s/compressed/it'\\''s.mp4'\n\
             file '/out/s/compressed/1.mp4'\n"
        );
    }

    #[tokio::test]
    async fn test_concat_rejects_empty_input() {
        let toolkit = FfmpegToolkit::default();
        let err = toolkit
            .concat(&[], Path::new("/tmp/never.mp4"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InsufficientInputs));
    }
}

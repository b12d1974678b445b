//! Normalize-or-copy policy and ordered concatenation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vve_models::VideoMetadata;

use crate::encoding::{EncodingConfig, NormalizeTarget, TranscodePlan};
use crate::error::{MediaError, MediaResult, MediaStage};
use crate::fs_utils::{copy_file, ensure_parent_dir};
use crate::toolkit::MediaToolkit;

/// How a clip reached its normalized location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMethod {
    /// Source already fit the target; bytes were copied.
    Copied,
    /// Source was re-encoded.
    Transcoded,
}

#[derive(Debug, Clone)]
pub struct NormalizeOutcome {
    pub path: PathBuf,
    pub source: VideoMetadata,
    pub output: VideoMetadata,
    pub method: NormalizeMethod,
}

#[derive(Debug, Clone)]
pub struct ConcatOutcome {
    pub path: PathBuf,
    pub metadata: VideoMetadata,
    pub inputs: usize,
}

/// Drives a [`MediaToolkit`] and owns the output file of each call.
///
/// On any failure the output location is cleared before the error returns.
#[derive(Clone)]
pub struct TranscodeEngine {
    toolkit: Arc<dyn MediaToolkit>,
    encoding: EncodingConfig,
}

impl TranscodeEngine {
    pub fn new(toolkit: Arc<dyn MediaToolkit>) -> Self {
        Self {
            toolkit,
            encoding: EncodingConfig::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn toolkit(&self) -> &Arc<dyn MediaToolkit> {
        &self.toolkit
    }

    pub async fn probe(&self, path: &Path, cancel: &CancellationToken) -> MediaResult<VideoMetadata> {
        self.toolkit.probe(path, cancel).await
    }

    /// Bring `input` within `target`, writing the result to `output`.
    ///
    /// Sources already within bounds are copied unchanged.
    pub async fn normalize(
        &self,
        input: &Path,
        output: &Path,
        target: NormalizeTarget,
        cancel: &CancellationToken,
    ) -> MediaResult<NormalizeOutcome> {
        let source = self.toolkit.probe(input, cancel).await?;
        self.normalize_from(input, output, source, target, cancel).await
    }

    /// [`Self::normalize`] for a source whose metadata is already known.
    pub async fn normalize_from(
        &self,
        input: &Path,
        output: &Path,
        source: VideoMetadata,
        target: NormalizeTarget,
        cancel: &CancellationToken,
    ) -> MediaResult<NormalizeOutcome> {
        // Nothing at `output` is ours yet.
        if cancel.is_cancelled() {
            return Err(MediaError::Cancelled);
        }

        let result = self.write_normalized(input, output, source, target, cancel).await;
        if result.is_err() {
            discard_output(output).await;
        }
        result.map_err(|e| e.in_stage(MediaStage::Transcode))
    }

    async fn write_normalized(
        &self,
        input: &Path,
        output: &Path,
        source: VideoMetadata,
        target: NormalizeTarget,
        cancel: &CancellationToken,
    ) -> MediaResult<NormalizeOutcome> {
        if source.fits_within(target.width, target.fps) {
            debug!(
                width = source.width,
                fps = source.fps,
                "Source within {}x@{}fps, copying",
                target.width,
                target.fps
            );
            copy_file(input, output).await?;
            return Ok(NormalizeOutcome {
                path: output.to_path_buf(),
                source,
                output: source,
                method: NormalizeMethod::Copied,
            });
        }

        let plan = TranscodePlan::for_source(&source, target, self.encoding.clone());
        info!(
            from_width = source.width,
            from_fps = source.fps,
            "Transcoding with filter {}",
            plan.video_filter()
        );
        ensure_parent_dir(output).await?;
        self.toolkit.transcode(input, output, &plan, cancel).await?;

        let produced = self.toolkit.probe(output, cancel).await?;
        Ok(NormalizeOutcome {
            path: output.to_path_buf(),
            source,
            output: produced,
            method: NormalizeMethod::Transcoded,
        })
    }

    /// Join `inputs` in order into `output`.
    ///
    /// Inputs must already be validated by the caller. All inputs must share
    /// width, height and frame rate. A single input is copied.
    pub async fn concatenate(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        cancel: &CancellationToken,
    ) -> MediaResult<ConcatOutcome> {
        let shape = self.concat_shape(inputs, cancel).await?;
        if cancel.is_cancelled() {
            return Err(MediaError::Cancelled);
        }
        self.write_concat(inputs, output, shape, cancel).await
    }

    /// Probe `inputs` and return the shared stream shape with summed duration.
    ///
    /// Never touches any output.
    pub async fn concat_shape(
        &self,
        inputs: &[PathBuf],
        cancel: &CancellationToken,
    ) -> MediaResult<VideoMetadata> {
        let Some(first) = inputs.first() else {
            return Err(MediaError::InsufficientInputs);
        };

        let mut shape = self.toolkit.probe(first, cancel).await?;
        let mut total_duration = shape.duration_secs;
        for (position, input) in inputs.iter().enumerate().skip(1) {
            let meta = self.toolkit.probe(input, cancel).await?;
            if !meta.same_stream_shape(&shape) {
                return Err(MediaError::IncompatibleStreams(format!(
                    "clip {} is {}x{}@{}fps, expected {}x{}@{}fps",
                    position, meta.width, meta.height, meta.fps, shape.width, shape.height, shape.fps
                )));
            }
            total_duration = total_duration.zip(meta.duration_secs).map(|(a, b)| a + b);
        }
        shape.duration_secs = total_duration;
        Ok(shape)
    }

    /// Write the join of `inputs` to `output`, given their [`Self::concat_shape`].
    ///
    /// Whatever was at `output` is replaced, or removed if the write fails.
    pub async fn write_concat(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        shape: VideoMetadata,
        cancel: &CancellationToken,
    ) -> MediaResult<ConcatOutcome> {
        let Some(first) = inputs.first() else {
            return Err(MediaError::InsufficientInputs);
        };

        let result = if inputs.len() == 1 {
            copy_file(first, output).await.map(|_| ())
        } else {
            match ensure_parent_dir(output).await {
                Ok(()) => self.toolkit.concat(inputs, output, cancel).await,
                Err(e) => Err(e),
            }
        };

        if let Err(e) = result {
            discard_output(output).await;
            return Err(e.in_stage(MediaStage::Concat));
        }

        info!("Concatenated {} clips into {}", inputs.len(), output.display());
        Ok(ConcatOutcome {
            path: output.to_path_buf(),
            metadata: shape,
            inputs: inputs.len(),
        })
    }
}

/// Remove a possibly partial output so retries never see it.
async fn discard_output(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => debug!("Removed partial output {}", output.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial output {}: {}", output.display(), e),
    }
}

//! Application state.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vve_analysis::GeminiClient;
use vve_media::FfmpegToolkit;
use vve_pipeline::{Orchestrator, PipelineConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Orchestrator,
    /// Directory uploads are spooled into
    pub upload_dir: PathBuf,
    /// Cancelled on shutdown; each request works under a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create state backed by FFmpeg and Gemini.
    pub async fn new(
        config: ApiConfig,
        pipeline: PipelineConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let toolkit = Arc::new(FfmpegToolkit::new(pipeline.ffmpeg_timeout_secs));
        let analysis = Arc::new(GeminiClient::from_env()?);
        let orchestrator = Orchestrator::from_config(&pipeline, toolkit, analysis)?;
        Self::with_orchestrator(config, orchestrator, pipeline.upload_temp_dir).await
    }

    /// Create state around an existing orchestrator.
    pub async fn with_orchestrator(
        config: ApiConfig,
        orchestrator: Orchestrator,
        upload_dir: PathBuf,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        tokio::fs::create_dir_all(&upload_dir).await?;
        Ok(Self {
            config,
            orchestrator,
            upload_dir,
            shutdown: CancellationToken::new(),
        })
    }

    /// Token for one request's pipeline work.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

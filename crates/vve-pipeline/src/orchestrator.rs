//! Request-level sequencing of storage, media and analysis.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use vve_analysis::{AnalysisEngine, EventExtractor};
use vve_media::{MediaToolkit, NormalizeMethod, NormalizeTarget, TranscodeEngine};
use vve_models::{ClipIndex, GameEvent, ProducedArtifact, SessionId, VideoMetadata, MAX_CLIP_INDEX};
use vve_storage::{remove_file_best_effort, remove_files_best_effort, SessionStore};

use crate::artifact::{ArtifactKind, ArtifactLedger, TempUpload};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::SessionLogger;
use crate::stage::{PipelineStage, StageTracker};

/// Result of normalizing one uploaded clip.
#[derive(Debug, Clone)]
pub struct CompressOutcome {
    pub path: PathBuf,
    pub source: VideoMetadata,
    pub output: VideoMetadata,
    pub method: NormalizeMethod,
    pub stages: Vec<PipelineStage>,
}

#[derive(Debug, Clone)]
pub struct ConcatClipsOutcome {
    pub path: PathBuf,
    pub metadata: VideoMetadata,
    pub inputs: usize,
    pub stages: Vec<PipelineStage>,
}

#[derive(Debug, Clone)]
pub struct EventsOutcome {
    pub events: Vec<GameEvent>,
    pub stages: Vec<PipelineStage>,
}

/// Result of the full upload-to-events run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub events: Vec<GameEvent>,
    pub artifacts: Vec<ProducedArtifact>,
    pub stages: Vec<PipelineStage>,
}

/// Sequences the pipeline for each request and owns every artifact it creates.
///
/// Any failure deletes the request's artifacts before the error is returned.
/// Requests for different sessions share nothing mutable. Requests for the
/// same session are not serialized here.
#[derive(Clone)]
pub struct Orchestrator {
    store: SessionStore,
    media: TranscodeEngine,
    extractor: EventExtractor,
    target: NormalizeTarget,
}

impl Orchestrator {
    pub fn new(
        store: SessionStore,
        toolkit: Arc<dyn MediaToolkit>,
        analysis: Arc<dyn AnalysisEngine>,
        target: NormalizeTarget,
    ) -> Self {
        Self {
            store,
            media: TranscodeEngine::new(toolkit),
            extractor: EventExtractor::new(analysis),
            target,
        }
    }

    /// Open the output root from `config` and wire the capabilities.
    pub fn from_config(
        config: &PipelineConfig,
        toolkit: Arc<dyn MediaToolkit>,
        analysis: Arc<dyn AnalysisEngine>,
    ) -> PipelineResult<Self> {
        let store = SessionStore::open(&config.output_dir)?;
        Ok(Self::new(store, toolkit, analysis, config.target))
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn target(&self) -> NormalizeTarget {
        self.target
    }

    /// Normalize one uploaded clip into `<session>/compressed/<index>.mp4`.
    ///
    /// The upload is deleted on every exit path.
    pub async fn compress_clip(
        &self,
        session: &SessionId,
        index: ClipIndex,
        upload: TempUpload,
        cancel: &CancellationToken,
    ) -> PipelineResult<CompressOutcome> {
        let logger = SessionLogger::new(session, "compress");
        let span = logger.create_span();
        logger.log_start(&format!("clip {}", index.value()));
        let mut tracker = StageTracker::new(logger);
        let mut ledger = ArtifactLedger::new();

        let result = self
            .compress_inner(session, index, &upload, &mut tracker, &mut ledger, cancel)
            .instrument(span)
            .await;

        match result {
            Ok(mut outcome) => {
                ledger.commit();
                tracker.enter(PipelineStage::Cleaning);
                upload.discard().await;
                tracker.enter(PipelineStage::Done);
                tracker.logger().log_completion(&format!(
                    "clip {} {:?} to {}x{}@{}fps",
                    index.value(),
                    outcome.method,
                    outcome.output.width,
                    outcome.output.height,
                    outcome.output.fps
                ));
                record_run("compress", "success");
                outcome.stages = tracker.history().to_vec();
                Ok(outcome)
            }
            Err(e) => {
                self.abort(&mut tracker, &mut ledger, vec![upload], &e).await;
                Err(e)
            }
        }
    }

    async fn compress_inner(
        &self,
        session: &SessionId,
        index: ClipIndex,
        upload: &TempUpload,
        tracker: &mut StageTracker,
        ledger: &mut ArtifactLedger,
        cancel: &CancellationToken,
    ) -> PipelineResult<CompressOutcome> {
        if !SessionStore::file_exists(upload.path()) {
            return Err(PipelineError::invalid_input("No video file provided"));
        }
        self.store.ensure_session_dirs(session).await?;

        tracker.enter(PipelineStage::Probing);
        let source = self.media.probe(upload.path(), cancel).await?;

        tracker.enter(if source.fits_within(self.target.width, self.target.fps) {
            PipelineStage::Copying
        } else {
            PipelineStage::Transcoding
        });
        let output = self.store.normalized_path(session, index);
        ensure_live(cancel)?;
        ledger.record(ArtifactKind::Normalized, &output);
        let normalized = self
            .media
            .normalize_from(upload.path(), &output, source, self.target, cancel)
            .await?;

        Ok(CompressOutcome {
            path: normalized.path,
            source: normalized.source,
            output: normalized.output,
            method: normalized.method,
            stages: Vec::new(),
        })
    }

    /// Join previously normalized clips, in order, into `<session>/final.mp4`.
    ///
    /// Every path is validated against the session before any media work.
    /// The inputs are deleted once the joined file exists.
    pub async fn concat_clips(
        &self,
        session: &SessionId,
        videos: &[String],
        cancel: &CancellationToken,
    ) -> PipelineResult<ConcatClipsOutcome> {
        let logger = SessionLogger::new(session, "concat");
        let span = logger.create_span();
        logger.log_start(&format!("{} clips", videos.len()));
        let mut tracker = StageTracker::new(logger);
        let mut ledger = ArtifactLedger::new();

        let result = self
            .concat_inner(session, videos, &mut tracker, &mut ledger, cancel)
            .instrument(span)
            .await;

        match result {
            Ok((mut outcome, inputs)) => {
                ledger.commit();
                tracker.enter(PipelineStage::Cleaning);
                let removed = remove_files_best_effort(&inputs).await;
                tracker.enter(PipelineStage::Done);
                tracker.logger().log_completion(&format!(
                    "joined {} clips, removed {} inputs",
                    outcome.inputs, removed
                ));
                record_run("concat", "success");
                outcome.stages = tracker.history().to_vec();
                Ok(outcome)
            }
            Err(e) => {
                self.abort(&mut tracker, &mut ledger, Vec::new(), &e).await;
                Err(e)
            }
        }
    }

    async fn concat_inner(
        &self,
        session: &SessionId,
        videos: &[String],
        tracker: &mut StageTracker,
        ledger: &mut ArtifactLedger,
        cancel: &CancellationToken,
    ) -> PipelineResult<(ConcatClipsOutcome, Vec<PathBuf>)> {
        if videos.is_empty() {
            return Err(PipelineError::insufficient_inputs(
                "No videos provided for concatenation",
            ));
        }

        let output = self.store.concatenated_path(session);
        let inputs = self.validate_existing(session, videos)?;
        if inputs.iter().any(|p| p == &output) {
            return Err(PipelineError::invalid_input(
                "The concatenated video cannot be one of the inputs",
            ));
        }

        tracker.enter(PipelineStage::Concatenating);
        let shape = self.media.concat_shape(&inputs, cancel).await?;
        ensure_live(cancel)?;
        ledger.record(ArtifactKind::Concatenated, &output);
        let joined = self.media.write_concat(&inputs, &output, shape, cancel).await?;

        Ok((
            ConcatClipsOutcome {
                path: joined.path,
                metadata: joined.metadata,
                inputs: joined.inputs,
                stages: Vec::new(),
            },
            inputs,
        ))
    }

    /// Analyse a session video and delete it on success.
    ///
    /// On failure the video is kept so the caller can retry.
    pub async fn extract_events(
        &self,
        session: &SessionId,
        video_path: &str,
        cancel: &CancellationToken,
    ) -> PipelineResult<EventsOutcome> {
        let logger = SessionLogger::new(session, "events");
        let span = logger.create_span();
        logger.log_start("analysing video");
        let mut tracker = StageTracker::new(logger);
        let mut ledger = ArtifactLedger::new();

        let result = async {
            let path = self.existing_path(session, video_path)?;
            tracker.enter(PipelineStage::Analyzing);
            let events = self.extractor.extract_events(&path, cancel).await?;
            Ok::<_, PipelineError>((path, events))
        }
        .instrument(span)
        .await;

        match result {
            Ok((path, events)) => {
                tracker.enter(PipelineStage::Cleaning);
                remove_file_best_effort(&path).await;
                tracker.enter(PipelineStage::Done);
                tracker
                    .logger()
                    .log_completion(&format!("{} events", events.len()));
                record_run("events", "success");
                Ok(EventsOutcome {
                    events,
                    stages: tracker.history().to_vec(),
                })
            }
            Err(e) => {
                self.abort(&mut tracker, &mut ledger, Vec::new(), &e).await;
                Err(e)
            }
        }
    }

    /// Full pipeline: normalize every upload, join them, analyse the result.
    ///
    /// Clips are normalized concurrently and all joined before
    /// concatenation starts. Intermediate files are removed on success;
    /// everything the request created is removed on failure.
    pub async fn run(
        &self,
        session: &SessionId,
        uploads: Vec<TempUpload>,
        cancel: &CancellationToken,
    ) -> PipelineResult<PipelineOutcome> {
        let logger = SessionLogger::new(session, "process");
        let span = logger.create_span();
        logger.log_start(&format!("{} uploads", uploads.len()));
        let mut tracker = StageTracker::new(logger);
        let mut ledger = ArtifactLedger::new();

        let result = self
            .run_inner(session, &uploads, &mut tracker, &mut ledger, cancel)
            .instrument(span)
            .await;

        match result {
            Ok((events, artifacts)) => {
                tracker.enter(PipelineStage::Cleaning);
                for upload in uploads {
                    upload.discard().await;
                }
                let removed = ledger.remove_all().await;
                tracker.enter(PipelineStage::Done);
                tracker.logger().log_completion(&format!(
                    "{} events, removed {} intermediate files",
                    events.len(),
                    removed
                ));
                record_run("process", "success");
                Ok(PipelineOutcome {
                    events,
                    artifacts,
                    stages: tracker.history().to_vec(),
                })
            }
            Err(e) => {
                self.abort(&mut tracker, &mut ledger, uploads, &e).await;
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        session: &SessionId,
        uploads: &[TempUpload],
        tracker: &mut StageTracker,
        ledger: &mut ArtifactLedger,
        cancel: &CancellationToken,
    ) -> PipelineResult<(Vec<GameEvent>, Vec<ProducedArtifact>)> {
        let max_clips = usize::from(MAX_CLIP_INDEX) + 1;
        if uploads.is_empty() {
            return Err(PipelineError::insufficient_inputs("No video file provided"));
        }
        if uploads.len() > max_clips {
            return Err(PipelineError::invalid_input(format!(
                "At most {max_clips} videos can be processed at once"
            )));
        }
        if uploads.iter().any(|u| !SessionStore::file_exists(u.path())) {
            return Err(PipelineError::invalid_input("No video file provided"));
        }
        self.store.ensure_session_dirs(session).await?;

        tracker.enter(PipelineStage::Probing);
        let sources = join_all(uploads.iter().map(|u| self.media.probe(u.path(), cancel)))
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let any_transcode = sources
            .iter()
            .any(|s| !s.fits_within(self.target.width, self.target.fps));
        tracker.enter(if any_transcode {
            PipelineStage::Transcoding
        } else {
            PipelineStage::Copying
        });

        let mut outputs = Vec::with_capacity(uploads.len());
        for position in 0..uploads.len() {
            let index = u8::try_from(position)
                .ok()
                .and_then(|i| ClipIndex::new(i).ok())
                .ok_or_else(|| PipelineError::invalid_input("Too many videos"))?;
            outputs.push(self.store.normalized_path(session, index));
        }

        ensure_live(cancel)?;
        for output in &outputs {
            ledger.record(ArtifactKind::Normalized, output);
        }

        let normalized = join_all(uploads.iter().zip(&sources).zip(&outputs).map(
            |((upload, source), output)| {
                self.media
                    .normalize_from(upload.path(), output, *source, self.target, cancel)
            },
        ))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

        tracker.enter(PipelineStage::Concatenating);
        let final_path = self.store.concatenated_path(session);
        let shape = self.media.concat_shape(&outputs, cancel).await?;
        ensure_live(cancel)?;
        ledger.record(ArtifactKind::Concatenated, &final_path);
        let joined = self
            .media
            .write_concat(&outputs, &final_path, shape, cancel)
            .await?;

        tracker.enter(PipelineStage::Analyzing);
        let events = self.extractor.extract_events(&joined.path, cancel).await?;

        let mut artifacts: Vec<ProducedArtifact> = normalized
            .iter()
            .map(|n| ProducedArtifact {
                kind: ArtifactKind::Normalized.as_str().to_string(),
                name: self.display_name(&n.path, session),
                metadata: Some(n.output),
                copied: Some(n.method == NormalizeMethod::Copied),
            })
            .collect();
        artifacts.push(ProducedArtifact {
            kind: ArtifactKind::Concatenated.as_str().to_string(),
            name: self.display_name(&joined.path, session),
            metadata: Some(joined.metadata),
            copied: None,
        });

        Ok((events, artifacts))
    }

    /// Resolve caller paths inside the session and require each to exist.
    fn validate_existing(
        &self,
        session: &SessionId,
        videos: &[String],
    ) -> PipelineResult<Vec<PathBuf>> {
        videos
            .iter()
            .map(|video| self.existing_path(session, video))
            .collect()
    }

    fn existing_path(&self, session: &SessionId, video: &str) -> PipelineResult<PathBuf> {
        let path = self.store.resolve_within(video, session)?;
        if !SessionStore::file_exists(&path) {
            return Err(PipelineError::not_found("Video file not found")
                .with_detail(path.display().to_string()));
        }
        Ok(path)
    }

    fn display_name(&self, path: &Path, session: &SessionId) -> String {
        self.store
            .relative_name(path, session)
            .unwrap_or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default()
            })
    }

    /// Enter `Errored` and delete everything the request created.
    async fn abort(
        &self,
        tracker: &mut StageTracker,
        ledger: &mut ArtifactLedger,
        uploads: Vec<TempUpload>,
        error: &PipelineError,
    ) {
        tracker.fail(error);
        for upload in uploads {
            upload.discard().await;
        }
        let removed = ledger.remove_all().await;
        if removed > 0 {
            tracker
                .logger()
                .log_warning(&format!("removed {removed} artifacts after failure"));
        }
        record_run(tracker.logger().operation(), "error");
    }
}

/// Fail fast once cancelled, before a write claims its output.
fn ensure_live(cancel: &CancellationToken) -> PipelineResult<()> {
    if cancel.is_cancelled() {
        return Err(PipelineError::cancelled());
    }
    Ok(())
}

fn record_run(operation: &'static str, outcome: &'static str) {
    counter!("vve_pipeline_runs_total", "operation" => operation, "outcome" => outcome).increment(1);
}

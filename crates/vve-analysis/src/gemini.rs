//! Gemini REST client for video analysis.
//!
//! Flow per request: resumable upload through the Files API, poll the file
//! until it is `ACTIVE`, run one schema-constrained `generateContent` call,
//! then delete the remote file.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Response};
use schemars::schema::RootSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::AnalysisEngine;
use crate::error::{AnalysisError, AnalysisResult};
use crate::schema::to_gemini_schema;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DISPLAY_NAME: &str = "volleyball_video.mp4";

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// API origin, without trailing slash
    pub base_url: String,
    /// Delay between file state checks
    pub poll_interval: Duration,
    /// Upper bound on waiting for the uploaded file to become usable
    pub processing_deadline: Duration,
    /// Per-request timeout for the non-upload calls
    pub request_timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(2),
            processing_deadline: Duration::from_secs(600),
            request_timeout: Duration::from_secs(300),
        }
    }

    /// Create config from environment variables.
    ///
    /// `GEMINI_API_KEY` is required.
    pub fn from_env() -> AnalysisResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AnalysisError::config_error("GEMINI_API_KEY not set"))?;

        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            if !base_url.trim().is_empty() {
                config = config.with_base_url(base_url);
            }
        }
        config.poll_interval = Duration::from_secs(
            std::env::var("ANALYSIS_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|s| *s > 0)
                .unwrap_or(2),
        );
        config.processing_deadline = Duration::from_secs(
            std::env::var("ANALYSIS_DEADLINE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(600),
        );
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_processing_deadline(mut self, deadline: Duration) -> Self {
        self.processing_deadline = deadline;
        self
    }
}

/// Processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum FileState {
    Processing,
    Active,
    Failed,
    #[serde(other)]
    Unspecified,
}

/// File resource returned by the Files API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteFile {
    name: String,
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    state: Option<FileState>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

#[derive(Debug, Serialize)]
struct UploadStart<'a> {
    file: UploadStartFile<'a>,
}

#[derive(Debug, Serialize)]
struct UploadStartFile<'a> {
    display_name: &'a str,
}

/// generateContent request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    File {
        #[serde(rename = "fileData")]
        file_data: FileData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

/// generateContent response.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Gemini API client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> AnalysisResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AnalysisError::config_error(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Create a new Gemini client from environment variables.
    pub fn from_env() -> AnalysisResult<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path.trim_start_matches('/'))
    }

    /// Upload `media` with the resumable protocol (start, then upload+finalize).
    async fn upload(&self, media: &Path) -> AnalysisResult<RemoteFile> {
        let size = tokio::fs::metadata(media).await?.len();
        let mime_type = mime_type_for(media);

        let start = self
            .client
            .post(self.url("upload/v1beta/files"))
            .header("x-goog-api-key", &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size)
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .timeout(self.config.request_timeout)
            .json(&UploadStart {
                file: UploadStartFile {
                    display_name: DISPLAY_NAME,
                },
            })
            .send()
            .await?;
        let start = check_status(start, "Gemini upload start").await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AnalysisError::remote_failed("upload start returned no upload URL", true))?;

        let file = tokio::fs::File::open(media).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let finished = self
            .client
            .post(&upload_url)
            .header(CONTENT_LENGTH, size)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(body)
            .send()
            .await?;
        let finished = check_status(finished, "Gemini upload").await?;

        let uploaded: UploadResponse = finished.json().await?;
        info!(
            file = %uploaded.file.name,
            bytes = size,
            "Uploaded video to Gemini"
        );
        Ok(uploaded.file)
    }

    async fn get_file(&self, name: &str) -> AnalysisResult<RemoteFile> {
        let response = self
            .client
            .get(self.url(&format!("v1beta/{name}")))
            .header("x-goog-api-key", &self.config.api_key)
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        let response = check_status(response, "Gemini file lookup").await?;
        Ok(response.json().await?)
    }

    /// Poll until the file leaves `PROCESSING`.
    async fn wait_until_active(
        &self,
        mut file: RemoteFile,
        cancel: &CancellationToken,
    ) -> AnalysisResult<RemoteFile> {
        let deadline = Instant::now() + self.config.processing_deadline;
        loop {
            match file.state {
                Some(FileState::Active) => return Ok(file),
                Some(FileState::Failed) => {
                    return Err(AnalysisError::remote_failed(
                        "remote engine failed to process the video",
                        false,
                    ))
                }
                _ => {}
            }

            if Instant::now() >= deadline {
                return Err(self.not_ready());
            }

            debug!(file = %file.name, "Waiting for Gemini to process video");
            tokio::select! {
                _ = tokio::time::sleep_until((Instant::now() + self.config.poll_interval).min(deadline)) => {}
                _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            }

            // A slow lookup still counts against the deadline.
            file = tokio::select! {
                polled = cancellable(cancel, self.get_file(&file.name)) => polled?,
                _ = tokio::time::sleep_until(deadline) => return Err(self.not_ready()),
            };
        }
    }

    fn not_ready(&self) -> AnalysisError {
        AnalysisError::remote_failed(
            format!(
                "video was not ready within {} seconds",
                self.config.processing_deadline.as_secs()
            ),
            true,
        )
    }

    async fn generate_content(
        &self,
        file: &RemoteFile,
        schema: Value,
        prompt: &str,
    ) -> AnalysisResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::File {
                        file_data: FileData {
                            mime_type: file.mime_type.as_deref().unwrap_or("video/mp4"),
                            file_uri: &file.uri,
                        },
                    },
                    Part::Text { text: prompt },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            },
        };

        let url = self.url(&format!("v1beta/models/{}:generateContent", self.config.model));
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .timeout(self.config.request_timeout)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response, "Gemini generateContent").await?;

        let body: GenerateResponse = response.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AnalysisError::invalid_response("no content in Gemini response"));
        }
        Ok(text)
    }

    /// Delete the uploaded file. Failures are logged only.
    async fn delete_file(&self, name: &str) {
        let result = self
            .client
            .delete(self.url(&format!("v1beta/{name}")))
            .header("x-goog-api-key", &self.config.api_key)
            .timeout(self.config.request_timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(file = %name, "Deleted remote file");
            }
            Ok(response) => warn!(file = %name, "Failed to delete remote file: {}", response.status()),
            Err(e) => warn!(file = %name, "Failed to delete remote file: {}", e),
        }
    }
}

#[async_trait]
impl AnalysisEngine for GeminiClient {
    async fn generate(
        &self,
        media: &Path,
        schema: &RootSchema,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> AnalysisResult<String> {
        let response_schema = to_gemini_schema(schema)?;

        let file = cancellable(cancel, self.upload(media)).await?;

        let result = async {
            let file = self.wait_until_active(file.clone(), cancel).await?;
            cancellable(cancel, self.generate_content(&file, response_schema, prompt)).await
        }
        .await;

        self.delete_file(&file.name).await;
        result
    }
}

/// Race `fut` against cancellation.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = AnalysisResult<T>>,
) -> AnalysisResult<T> {
    tokio::select! {
        result = fut => result,
        _ = cancel.cancelled() => Err(AnalysisError::Cancelled),
    }
}

/// Turn a non-success response into an error, logging its body.
async fn check_status(response: Response, context: &str) -> AnalysisResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("{} returned {}: {}", context, status, body);
    Err(AnalysisError::from_status(context, status))
}

fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        _ => "video/mp4",
    }
}

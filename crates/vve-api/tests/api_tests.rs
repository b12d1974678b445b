//! API integration tests.
//!
//! The router runs against fake media and analysis capabilities, so no
//! external process or network call is made.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use schemars::schema::RootSchema;
use serde_json::Value;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use vve_analysis::{AnalysisEngine, AnalysisError, AnalysisResult};
use vve_api::{create_router, ApiConfig, AppState};
use vve_media::{MediaError, MediaResult, MediaToolkit, NormalizeTarget, TranscodePlan};
use vve_models::VideoMetadata;
use vve_pipeline::Orchestrator;
use vve_storage::SessionStore;

const BOUNDARY: &str = "vve-test-boundary";

/// Media files are text of the form `<width> <height> <fps>`.
struct FakeToolkit;

#[async_trait]
impl MediaToolkit for FakeToolkit {
    async fn probe(&self, path: &Path, _cancel: &CancellationToken) -> MediaResult<VideoMetadata> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|_| MediaError::probe_failed("unreadable"))?;
        let fields: Vec<u32> = text
            .split_whitespace()
            .filter_map(|f| f.parse().ok())
            .collect();
        match fields[..] {
            [w, h, fps] => Ok(VideoMetadata::new(w, h, fps)),
            _ => Err(MediaError::probe_failed("no video stream")),
        }
    }

    async fn transcode(
        &self,
        _input: &Path,
        output: &Path,
        plan: &TranscodePlan,
        _cancel: &CancellationToken,
    ) -> MediaResult<()> {
        let contents = format!("{} {} {}", plan.width, plan.width * 9 / 16, plan.fps);
        tokio::fs::write(output, contents).await?;
        Ok(())
    }

    async fn concat(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        _cancel: &CancellationToken,
    ) -> MediaResult<()> {
        tokio::fs::copy(&inputs[0], output).await?;
        Ok(())
    }
}

struct FakeEngine {
    answer: Option<&'static str>,
}

#[async_trait]
impl AnalysisEngine for FakeEngine {
    async fn generate(
        &self,
        _media: &Path,
        _schema: &RootSchema,
        _prompt: &str,
        _cancel: &CancellationToken,
    ) -> AnalysisResult<String> {
        self.answer
            .map(str::to_string)
            .ok_or_else(|| AnalysisError::remote_failed("file state FAILED", false))
    }
}

const EVENTS_JSON: &str =
    r#"[{"type": "serve", "timestamp": 2.0, "confidence": 0.8}, {"type": "rally_end", "timestamp": 9.5, "confidence": 0.6}]"#;

struct TestApp {
    router: Router,
    output: TempDir,
    uploads: TempDir,
}

impl TestApp {
    async fn new(answer: Option<&'static str>) -> Self {
        let output = TempDir::new().unwrap();
        let uploads = TempDir::new().unwrap();
        let orchestrator = Orchestrator::new(
            SessionStore::open(output.path()).unwrap(),
            Arc::new(FakeToolkit),
            Arc::new(FakeEngine { answer }),
            NormalizeTarget::default(),
        );
        let state = AppState::with_orchestrator(
            ApiConfig::default(),
            orchestrator,
            uploads.path().to_path_buf(),
        )
        .await
        .unwrap();
        Self {
            router: create_router(state, None),
            output,
            uploads,
        }
    }

    fn session_dir(&self, session: &str) -> PathBuf {
        self.output.path().canonicalize().unwrap().join(session)
    }

    fn session_file(&self, session: &str, relative: &str, contents: &str) -> PathBuf {
        let path = self.session_dir(session).join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn upload_count(&self) -> usize {
        std::fs::read_dir(self.uploads.path()).unwrap().count()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

/// Multipart body with one part per `(field, mime, contents)`.
fn multipart(parts: &[(&str, &str, &str)]) -> Body {
    let mut body = String::new();
    for (i, (field, mime, contents)) in parts.iter().enumerate() {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"clip{i}.mp4\"\r\nContent-Type: {mime}\r\n\r\n{contents}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Body::from(body)
}

fn multipart_request(uri: &str, parts: &[(&str, &str, &str)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(multipart(parts))
        .unwrap()
}

fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Test health endpoint.
#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new(None).await;

    let response = app.router.clone().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new(None).await;
    let request = Request::builder()
        .uri("/health")
        .header("X-Request-ID", "abc-123")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn test_new_game_id_is_a_uuid() {
    let app = TestApp::new(None).await;

    let (status, body) = app.send(get("/newGameId")).await;

    assert_eq!(status, StatusCode::OK);
    let id = body["gameId"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn test_compress_copies_small_clip() {
    let app = TestApp::new(None).await;

    let (status, body) = app
        .send(multipart_request(
            "/compress/game-1/0",
            &[("video", "video/mp4", "640 360 24")],
        ))
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Video compressed successfully");
    let url = body["compressedVideoUrl"].as_str().unwrap();
    assert!(url.ends_with("game-1/compressed/0.mp4"));
    assert_eq!(std::fs::read_to_string(url).unwrap(), "640 360 24");
    assert_eq!(app.upload_count(), 0);
}

#[tokio::test]
async fn test_compress_rejects_bad_parameters() {
    let app = TestApp::new(None).await;

    for uri in ["/compress/game-1/11", "/compress/game-1/abc", "/compress/game-1/-1"] {
        let (status, body) = app
            .send(multipart_request(uri, &[("video", "video/mp4", "640 360 24")]))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["message"], "Video index must be a number between 0 and 10");
        assert_eq!(body["statusCode"], 400);
    }

    let (status, _) = app
        .send(multipart_request(
            "/compress/bad%20id/0",
            &[("video", "video/mp4", "640 360 24")],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compress_rejects_missing_and_non_video_uploads() {
    let app = TestApp::new(None).await;

    let (status, body) = app
        .send(multipart_request(
            "/compress/game-1/0",
            &[("video", "text/plain", "640 360 24")],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Invalid file type: text/plain"));

    let (status, body) = app
        .send(multipart_request(
            "/compress/game-1/0",
            &[("other", "video/mp4", "640 360 24")],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No video file provided");
    assert_eq!(app.upload_count(), 0);
}

#[tokio::test]
async fn test_compress_probe_failure_is_server_error() {
    let app = TestApp::new(None).await;

    let (status, body) = app
        .send(multipart_request(
            "/compress/game-1/0",
            &[("video", "video/mp4", "garbage")],
        ))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to read video metadata");
    assert_eq!(app.upload_count(), 0);
}

#[tokio::test]
async fn test_concat_joins_and_cleans_inputs() {
    let app = TestApp::new(None).await;
    let a = app.session_file("game-1", "compressed/0.mp4", "1280 720 24");
    let b = app.session_file("game-1", "compressed/1.mp4", "1280 720 24");

    let body = serde_json::json!({ "videos": [a.display().to_string(), "compressed/1.mp4"] });
    let (status, body) = app
        .send(json_request("/concat/game-1", &body.to_string()))
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Videos concatenated successfully");
    assert!(body["concatenatedVideoUrl"]
        .as_str()
        .unwrap()
        .ends_with("game-1/final.mp4"));
    assert!(!a.exists());
    assert!(!b.exists());
}

#[tokio::test]
async fn test_concat_rejects_paths_outside_session() {
    let app = TestApp::new(None).await;
    let other = app.session_file("game-2", "compressed/0.mp4", "1280 720 24");

    let body = serde_json::json!({ "videos": [other.display().to_string()] });
    let (status, body) = app
        .send(json_request("/concat/game-1", &body.to_string()))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["message"].as_str().unwrap().contains("game-2"));
    assert!(other.exists());
}

#[tokio::test]
async fn test_concat_input_errors() {
    let app = TestApp::new(None).await;

    let (status, body) = app
        .send(json_request("/concat/game-1", r#"{"videos": []}"#))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No videos provided for concatenation");

    let (status, _) = app
        .send(json_request("/concat/game-1", r#"{"videos": ["compressed/7.mp4"]}"#))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(json_request("/concat/game-1", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_events_require_query_parameters() {
    let app = TestApp::new(Some(EVENTS_JSON)).await;

    let (status, body) = app.send(get("/events?videoPath=final.mp4")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Game ID is required");

    let (status, body) = app.send(get("/events?sessionId=game-1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Video path is required");

    let (status, _) = app
        .send(get("/events?sessionId=game-1&videoPath=..%2F..%2Fetc%2Fpasswd"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(get("/events?sessionId=game-1&videoPath=final.mp4"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_events_accept_game_id_alias_and_delete_video() {
    let app = TestApp::new(Some(EVENTS_JSON)).await;
    let video = app.session_file("game-1", "final.mp4", "1280 720 24");

    let (status, body) = app
        .send(get("/events?gameId=game-1&videoPath=final.mp4"))
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Game events retrieved successfully");
    assert_eq!(body["events"][0]["type"], "serve");
    assert_eq!(body["events"][1]["type"], "rally_end");
    assert_eq!(body["events"][1]["timestamp"], 9.5);
    assert!(!video.exists());
}

#[tokio::test]
async fn test_events_remote_failure_keeps_video() {
    let app = TestApp::new(None).await;
    let video = app.session_file("game-1", "final.mp4", "1280 720 24");

    let (status, body) = app
        .send(get("/events?sessionId=game-1&videoPath=final.mp4"))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Video analysis failed");
    assert!(video.exists());
}

#[tokio::test]
async fn test_process_runs_full_pipeline() {
    let app = TestApp::new(Some(EVENTS_JSON)).await;

    let (status, body) = app
        .send(multipart_request(
            "/process/game-1",
            &[
                ("video", "video/mp4", "1920 1080 30"),
                ("video", "video/quicktime", "1920 1080 60"),
            ],
        ))
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["events"].as_array().unwrap().len(), 2);
    assert_eq!(body["artifacts"].as_array().unwrap().len(), 3);
    assert_eq!(body["artifacts"][2]["name"], "final.mp4");
    assert_eq!(body["stages"][0], "uploading");
    assert_eq!(body["stages"].as_array().unwrap().last().unwrap(), "done");
    assert_eq!(app.upload_count(), 0);
    assert!(!app.session_dir("game-1").join("final.mp4").exists());
}

#[tokio::test]
async fn test_process_failure_cleans_everything() {
    let app = TestApp::new(None).await;

    let (status, body) = app
        .send(multipart_request(
            "/process/game-1",
            &[("video", "video/mp4", "1920 1080 30")],
        ))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["statusCode"], 500);
    assert_eq!(app.upload_count(), 0);
    assert!(!app.session_dir("game-1").join("compressed/0.mp4").exists());
    assert!(!app.session_dir("game-1").join("final.mp4").exists());
}

#[tokio::test]
async fn test_process_without_videos_is_bad_request() {
    let app = TestApp::new(Some(EVENTS_JSON)).await;

    let (status, body) = app
        .send(multipart_request("/process/game-1", &[("note", "text/plain", "hi")]))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No video file provided");
}

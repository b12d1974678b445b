//! Gemini REST protocol against a mock server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use vve_analysis::{AnalysisError, EventExtractor, GeminiClient, GeminiConfig};
use vve_models::EventType;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FILE_NAME: &str = "files/abc123";

fn remote_file(state: &str) -> serde_json::Value {
    json!({
        "name": FILE_NAME,
        "uri": "https://generativelanguage.googleapis.com/v1beta/files/abc123",
        "mimeType": "video/mp4",
        "state": state,
    })
}

fn client(server: &MockServer) -> Arc<GeminiClient> {
    let config = GeminiConfig::new("test-key")
        .with_base_url(server.uri())
        .with_poll_interval(Duration::from_millis(10))
        .with_processing_deadline(Duration::from_millis(300));
    Arc::new(GeminiClient::new(config).unwrap())
}

fn video(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("final.mp4");
    std::fs::write(&path, b"fake video bytes").unwrap();
    path
}

/// Mount the upload handshake; the file starts in `initial_state`.
async fn mount_upload(server: &MockServer, initial_state: &str) {
    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .and(header("x-goog-api-key", "test-key"))
        .and(header("X-Goog-Upload-Protocol", "resumable"))
        .and(header("X-Goog-Upload-Command", "start"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-goog-upload-url", format!("{}/upload-session/1", server.uri()).as_str()),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/upload-session/1"))
        .and(header("X-Goog-Upload-Offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "file": remote_file(initial_state) })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_delete(server: &MockServer) {
    Mock::given(method("DELETE"))
        .and(path(format!("/v1beta/{FILE_NAME}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(server)
        .await;
}

fn generation(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    }))
}

#[tokio::test]
async fn extracts_events_through_full_protocol() {
    let server = MockServer::start().await;
    mount_upload(&server, "PROCESSING").await;
    mount_delete(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/v1beta/{FILE_NAME}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_file("ACTIVE")))
        .expect(1..)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(body_partial_json(json!({
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": { "type": "ARRAY", "items": { "type": "OBJECT" } }
            }
        })))
        .respond_with(generation(
            r#"[{"type":"serve","timestamp":1.5,"confidence":0.9},{"type":"point_won","timestamp":9.0,"confidence":0.7}]"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let extractor = EventExtractor::new(client(&server));
    let events = extractor
        .extract_events(&video(&dir), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, EventType::Serve);
    assert_eq!(events[1].event_type, EventType::PointWon);
}

#[tokio::test]
async fn invalid_confidence_rejects_response() {
    let server = MockServer::start().await;
    mount_upload(&server, "ACTIVE").await;
    mount_delete(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(generation(r#"[{"type":"serve","timestamp":1.0,"confidence":1.5}]"#))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = EventExtractor::new(client(&server))
        .extract_events(&video(&dir), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::InvalidResponse(_)));
}

#[tokio::test]
async fn failed_processing_is_remote_failure_and_cleans_up() {
    let server = MockServer::start().await;
    mount_upload(&server, "PROCESSING").await;
    mount_delete(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/v1beta/{FILE_NAME}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_file("FAILED")))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = EventExtractor::new(client(&server))
        .extract_events(&video(&dir), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AnalysisError::RemoteProcessingFailed { retryable: false, .. }
    ));
}

#[tokio::test]
async fn processing_deadline_expires() {
    let server = MockServer::start().await;
    mount_upload(&server, "PROCESSING").await;
    mount_delete(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/v1beta/{FILE_NAME}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_file("PROCESSING")))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(generation("[]"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = EventExtractor::new(client(&server))
        .extract_events(&video(&dir), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AnalysisError::RemoteProcessingFailed { retryable: true, .. }
    ));
}

#[tokio::test]
async fn server_errors_are_retryable_client_errors_are_not() {
    for (status, retryable) in [(503, true), (429, true), (400, false)] {
        let server = MockServer::start().await;
        mount_upload(&server, "ACTIVE").await;
        mount_delete(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream says no"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let err = EventExtractor::new(client(&server))
            .extract_events(&video(&dir), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.is_retryable(), retryable, "status {status}");
        assert!(matches!(err, AnalysisError::RemoteProcessingFailed { .. }));
    }
}

#[tokio::test]
async fn cancellation_stops_before_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let dir = TempDir::new().unwrap();
    let err = EventExtractor::new(client(&server))
        .extract_events(&video(&dir), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::Cancelled));
}

#[tokio::test]
async fn slow_status_lookup_is_bounded_by_deadline() {
    let server = MockServer::start().await;
    mount_upload(&server, "PROCESSING").await;
    mount_delete(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/v1beta/{FILE_NAME}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(remote_file("ACTIVE"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let started = std::time::Instant::now();
    let err = EventExtractor::new(client(&server))
        .extract_events(&video(&dir), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AnalysisError::RemoteProcessingFailed { retryable: true, .. }
    ));
    assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
}

#[tokio::test]
async fn cancellation_interrupts_slow_status_lookup() {
    let server = MockServer::start().await;
    mount_upload(&server, "PROCESSING").await;
    mount_delete(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("/v1beta/{FILE_NAME}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(remote_file("ACTIVE"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    // Long deadline so only the cancel can end the wait.
    let config = GeminiConfig::new("test-key")
        .with_base_url(server.uri())
        .with_poll_interval(Duration::from_millis(10))
        .with_processing_deadline(Duration::from_secs(60));
    let client = Arc::new(GeminiClient::new(config).unwrap());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let dir = TempDir::new().unwrap();
    let started = std::time::Instant::now();
    let err = EventExtractor::new(client)
        .extract_events(&video(&dir), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
}

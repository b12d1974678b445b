//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vve_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vve_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vve_http_requests_in_flight";

    // Upload metrics
    pub const UPLOADS_TOTAL: &str = "vve_uploads_total";
    pub const UPLOAD_BYTES_TOTAL: &str = "vve_upload_bytes_total";
    pub const UPLOADS_REJECTED_TOTAL: &str = "vve_uploads_rejected_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a spooled upload.
pub fn record_upload(bytes: u64) {
    counter!(names::UPLOADS_TOTAL).increment(1);
    counter!(names::UPLOAD_BYTES_TOTAL).increment(bytes);
}

/// Record an upload refused before spooling.
pub fn record_upload_rejected(reason: &'static str) {
    counter!(names::UPLOADS_REJECTED_TOTAL, "reason" => reason).increment(1);
}

/// Route template for labels, so session ids never become label values.
fn route_label(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string())
}

/// Middleware recording request counts and latencies.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = route_label(&request);
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

//! Axum HTTP API server.
//!
//! This crate provides:
//! - Compress, concat, events and full-pipeline endpoints
//! - Multipart upload spooling with a MIME allow-list
//! - Security headers, request ids and request logging
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod upload;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;

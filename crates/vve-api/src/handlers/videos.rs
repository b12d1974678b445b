//! Clip compression and concatenation handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use tracing::info;
use vve_models::{
    ClipIndex, CompressVideoResponse, ConcatVideoRequest, ConcatVideoResponse, SessionId,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::upload::spool_video;

/// `POST /compress/{sessionId}/{clipIndex}` with a multipart `video` field.
pub async fn compress_video(
    State(state): State<AppState>,
    Path((session_id, clip_index)): Path<(String, String)>,
    mut multipart: Multipart,
) -> ApiResult<Json<CompressVideoResponse>> {
    let session = SessionId::parse(&session_id)?;
    let index = ClipIndex::parse(&clip_index)?;

    let upload = spool_video(&mut multipart, &state.upload_dir).await?;
    info!(session_id = %session, clip = index.value(), "Compressing clip");

    let outcome = state
        .orchestrator
        .compress_clip(&session, index, upload, &state.request_token())
        .await?;

    Ok(Json(CompressVideoResponse {
        message: "Video compressed successfully".to_string(),
        compressed_video_url: outcome.path.display().to_string(),
    }))
}

/// `POST /concat/{sessionId}` with `{"videos": [...]}`.
pub async fn concat_videos(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Result<Json<ConcatVideoRequest>, JsonRejection>,
) -> ApiResult<Json<ConcatVideoResponse>> {
    let session = SessionId::parse(&session_id)?;
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let outcome = state
        .orchestrator
        .concat_clips(&session, &request.videos, &state.request_token())
        .await?;

    Ok(Json(ConcatVideoResponse {
        message: "Videos concatenated successfully".to_string(),
        concatenated_video_url: outcome.path.display().to_string(),
    }))
}

//! Game id, event extraction and full pipeline handlers.

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::Deserialize;
use vve_models::{
    GameEventsResponse, NewGameIdResponse, ProcessGameResponse, SessionId, MAX_CLIP_INDEX,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::upload::spool_videos;

/// `GET /newGameId`
pub async fn new_game_id() -> Json<NewGameIdResponse> {
    Json(NewGameIdResponse {
        game_id: SessionId::new().to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub session_id: Option<String>,
    /// Older clients send `gameId`
    pub game_id: Option<String>,
    pub video_path: Option<String>,
}

/// `GET /events?sessionId=&videoPath=`
///
/// Deletes the video once its events were extracted.
pub async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Json<GameEventsResponse>> {
    let session_id = query
        .session_id
        .filter(|s| !s.is_empty())
        .or(query.game_id.filter(|s| !s.is_empty()))
        .ok_or_else(|| ApiError::bad_request("Game ID is required"))?;
    let video_path = query
        .video_path
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Video path is required"))?;
    let session = SessionId::parse(&session_id)?;

    let outcome = state
        .orchestrator
        .extract_events(&session, &video_path, &state.request_token())
        .await?;

    Ok(Json(GameEventsResponse {
        message: "Game events retrieved successfully".to_string(),
        events: outcome.events,
    }))
}

/// `POST /process/{sessionId}` with one or more multipart `video` fields.
pub async fn process_game(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<ProcessGameResponse>> {
    let session = SessionId::parse(&session_id)?;
    let max_files = usize::from(MAX_CLIP_INDEX) + 1;
    let uploads = spool_videos(&mut multipart, &state.upload_dir, max_files).await?;
    if uploads.is_empty() {
        return Err(ApiError::bad_request("No video file provided"));
    }

    let outcome = state
        .orchestrator
        .run(&session, uploads, &state.request_token())
        .await?;

    Ok(Json(ProcessGameResponse {
        message: "Game processed successfully".to_string(),
        events: outcome.events,
        artifacts: outcome.artifacts,
        stages: outcome
            .stages
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
    }))
}

//! Spooling multipart video uploads to the temp directory.

use std::path::Path;

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;
use vve_pipeline::TempUpload;

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Multipart field carrying a video.
pub const VIDEO_FIELD: &str = "video";

/// Accepted upload MIME types.
pub const ALLOWED_MIME_TYPES: [&str; 5] = [
    "video/mp4",
    "video/quicktime",
    "video/x-msvideo",
    "video/webm",
    "video/x-matroska",
];

/// Spool every `video` field, in order, into `dir`.
///
/// At most `max_files` are accepted. Each spooled file is owned by a
/// [`TempUpload`] as soon as it is created, so a failure part-way removes
/// whatever was already written. Other fields are skipped.
pub async fn spool_videos(
    multipart: &mut Multipart,
    dir: &Path,
    max_files: usize,
) -> ApiResult<Vec<TempUpload>> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(VIDEO_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }
        if uploads.len() == max_files {
            metrics::record_upload_rejected("too_many_files");
            return Err(ApiError::bad_request(format!(
                "At most {max_files} videos can be uploaded at once"
            )));
        }
        uploads.push(spool_field(field, dir).await?);
    }

    Ok(uploads)
}

/// Spool the single `video` field of a request.
pub async fn spool_video(multipart: &mut Multipart, dir: &Path) -> ApiResult<TempUpload> {
    spool_videos(multipart, dir, 1)
        .await?
        .pop()
        .ok_or_else(|| ApiError::bad_request("No video file provided"))
}

async fn spool_field(mut field: Field<'_>, dir: &Path) -> ApiResult<TempUpload> {
    let mime = field.content_type().unwrap_or("").to_string();
    if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
        metrics::record_upload_rejected("mime_type");
        return Err(ApiError::bad_request(format!(
            "Invalid file type: {}. Allowed types: {}",
            if mime.is_empty() { "unknown" } else { &mime },
            ALLOWED_MIME_TYPES.join(", ")
        )));
    }

    let name = upload_file_name(field.file_name());
    let upload = TempUpload::new(dir.join(&name));
    let mut file = tokio::fs::File::create(upload.path())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create upload file: {e}")))?;

    let mut written: u64 = 0;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to write upload: {e}")))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to write upload: {e}")))?;

    info!(
        "Spooled upload {} ({:.2} MB)",
        name,
        written as f64 / 1024.0 / 1024.0
    );
    metrics::record_upload(written);
    Ok(upload)
}

/// `<millis>-<uuid><ext>`; only the extension of the client's name is kept.
pub fn upload_file_name(original: Option<&str>) -> String {
    let ext = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();
    format!(
        "{}-{}{}",
        chrono::Utc::now().timestamp_millis(),
        Uuid::new_v4(),
        ext
    )
}

//! Video label detection handler.

use axum::{
    extract::{Multipart, State},
    Json,
};
use tracing::{info, warn};

use vizor_core::{Error, VideoLabel};

use crate::{ApiError, AppState};

/// Label an uploaded video.
///
/// # Multipart Fields
/// - `video`: Video file (required)
///
/// # Returns
/// - 200 OK with `[{description, categoryDescriptions, segments}]`
/// - 400 Bad Request if the field is missing or empty
/// - 502 Bad Gateway if the annotation service fails
/// - 503 Service Unavailable if video labeling is not configured
pub async fn detect_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<VideoLabel>>, ApiError> {
    let labeler = state.providers.video().ok_or_else(|| {
        ApiError::ServiceUnavailable("Video labeling is not configured".to_string())
    })?;

    let mut video: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("video") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?;
            video = Some(data.to_vec());
        }
    }

    let video = video
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No video file uploaded".to_string()))?;

    match labeler.annotate(&video).await {
        Ok(labels) => {
            info!(
                subsystem = "api",
                component = "video",
                op = "detect_video",
                size = video.len(),
                label_count = labels.len(),
                "Video labeled"
            );
            Ok(Json(labels))
        }
        Err(e @ (Error::Transport(_) | Error::MalformedResponse(_))) => {
            warn!(
                subsystem = "api",
                component = "video",
                error = %e,
                "Video labeling failed"
            );
            Err(ApiError::Upstream {
                error: "Failed to detect labels in video".to_string(),
                message: e.to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

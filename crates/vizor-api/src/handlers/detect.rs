//! Object detection handlers.
//!
//! Single-provider endpoints return the normalized detections directly.
//! `/api/compare` runs every configured provider on the same image and
//! persists the outcome when an image URL is supplied.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use vizor_core::{DetectionRecord, Error, Provider};
use vizor_inference::compare_all;

use crate::{ApiError, AppState};

/// Request body for detection endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    /// Base64-encoded image, optionally as a `data:` URL.
    pub base64_image: Option<String>,
    /// Reference to the stored image. Only used by `/api/compare`.
    pub image_url: Option<String>,
}

impl DetectRequest {
    /// The bare base64 payload, or 400 when it is missing.
    fn image(&self) -> Result<&str, ApiError> {
        let raw = self
            .base64_image
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::BadRequest("No image data provided".to_string()))?;
        Ok(strip_data_url(raw))
    }
}

/// Drop a `data:<mime>;base64,` prefix if present.
pub fn strip_data_url(value: &str) -> &str {
    if value.starts_with("data:") {
        if let Some((_, payload)) = value.split_once(',') {
            return payload;
        }
    }
    value
}

async fn detect_with(
    state: &AppState,
    provider: Provider,
    body: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<Vec<DetectionRecord>>, ApiError> {
    let Json(req) = body?;
    let image = req.image()?;

    let backend = state
        .providers
        .require(provider)
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

    match backend.detect(image).await {
        Ok(records) => {
            info!(
                subsystem = "api",
                component = "detect",
                provider = %provider,
                result_count = records.len(),
                "Detection complete"
            );
            Ok(Json(records))
        }
        Err(e @ (Error::Transport(_) | Error::MalformedResponse(_))) => {
            warn!(
                subsystem = "api",
                component = "detect",
                provider = %provider,
                error = %e,
                "Detection failed"
            );
            Err(ApiError::Upstream {
                error: format!("Failed to detect objects with {}", provider),
                message: e.to_string(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn detect_vision(
    State(state): State<AppState>,
    body: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<Vec<DetectionRecord>>, ApiError> {
    detect_with(&state, Provider::Vision, body).await
}

pub async fn detect_vertex(
    State(state): State<AppState>,
    body: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<Vec<DetectionRecord>>, ApiError> {
    detect_with(&state, Provider::Vertex, body).await
}

pub async fn detect_gemini(
    State(state): State<AppState>,
    body: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<Vec<DetectionRecord>>, ApiError> {
    detect_with(&state, Provider::Gemini, body).await
}

/// Response from `/api/compare`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResponse {
    pub results: BTreeMap<Provider, Vec<DetectionRecord>>,
    pub errors: BTreeMap<Provider, String>,
    /// Id of the persisted record, when one was stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Uuid>,
}

/// Run every configured provider on one image.
///
/// # Returns
/// - 200 OK with per-provider results and errors
/// - 400 Bad Request if `base64Image` is missing
/// - 503 Service Unavailable if no provider is configured
pub async fn compare(
    State(state): State<AppState>,
    body: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<CompareResponse>, ApiError> {
    let Json(req) = body?;
    let image = req.image()?;

    let providers = state.providers.detection_providers();
    if providers.is_empty() {
        return Err(ApiError::ServiceUnavailable(
            "No detection provider is configured".to_string(),
        ));
    }

    let report = compare_all(&providers, image).await;

    let image_url = req.image_url.as_deref().filter(|u| !u.trim().is_empty());
    let record_id = match image_url {
        Some(url) if !report.results.is_empty() => {
            Some(state.records.add(report.to_image_record(url)).await?)
        }
        _ => None,
    };

    Ok(Json(CompareResponse {
        results: report.results,
        errors: report.errors,
        record_id,
    }))
}

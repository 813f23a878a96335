//! Image upload, serving, persistence and tag search handlers.

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use vizor_core::{NewImageRecord, ProviderResults, TagMatch};
use vizor_db::{blob_path_from_url, blob_url, detect_content_type, generate_image_path};

use crate::{ApiError, AppState};

/// Response from image upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// The uploaded bytes, base64-encoded, ready for the detect endpoints.
    pub base64_image: String,
    /// Public URL of the stored blob.
    pub image_url: String,
}

/// Store an uploaded image.
///
/// # Multipart Fields
/// - `image`: Image file (required)
///
/// # Returns
/// - 200 OK with `base64Image` and `imageUrl`
/// - 400 Bad Request if the field is missing or empty
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("image") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?;
            upload = Some((filename, data.to_vec()));
        }
    }

    let (filename, data) =
        upload.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;
    if data.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    let path = generate_image_path(&filename);
    state.blobs.write(&path, &data).await?;

    let image_url = blob_url(&state.public_base_url, &path);
    info!(
        subsystem = "api",
        component = "images",
        op = "upload",
        blob_path = %path,
        size = data.len(),
        "Image uploaded"
    );

    Ok(Json(UploadResponse {
        base64_image: base64::engine::general_purpose::STANDARD.encode(&data),
        image_url,
    }))
}

/// Serve stored blob bytes.
pub async fn get_image(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let data = state.blobs.read(&path).await?;
    let content_type = detect_content_type(&data);
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], data))
}

/// Request body for persisting a comparison.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecordRequest {
    pub image_url: Option<String>,
    /// Per-provider detections. Bounding boxes, if sent, are dropped.
    #[serde(default)]
    pub results: ProviderResults,
}

#[derive(Debug, Serialize)]
pub struct SaveRecordResponse {
    pub id: Uuid,
}

/// Persist an image record.
pub async fn save_record(
    State(state): State<AppState>,
    body: Result<Json<SaveRecordRequest>, JsonRejection>,
) -> Result<Json<SaveRecordResponse>, ApiError> {
    let Json(req) = body?;
    let image_url = req
        .image_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("imageUrl is required".to_string()))?;

    let id = state
        .records
        .add(NewImageRecord {
            image_url,
            results: req.results,
        })
        .await?;

    Ok(Json(SaveRecordResponse { id }))
}

/// One image returned by tag search.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedImage {
    pub image_url: String,
    pub base64: String,
    pub mime_type: String,
    /// Labels detected in the image by any provider.
    pub tags: Vec<String>,
}

/// Images whose detections include `tag`, best match first, with bytes inlined.
///
/// Records whose blob cannot be resolved or read are skipped.
pub async fn images_by_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Json<Vec<TaggedImage>>, ApiError> {
    let matches = state.search.search(&tag).await?;

    let mut images = Vec::with_capacity(matches.len());
    for TagMatch {
        image_url, labels, ..
    } in matches
    {
        let Some(path) = blob_path_from_url(&state.public_base_url, &image_url) else {
            warn!(
                subsystem = "api",
                component = "images",
                image_url = %image_url,
                "Image URL does not reference a local blob"
            );
            continue;
        };
        let data = match state.blobs.read(path).await {
            Ok(data) => data,
            Err(e) => {
                warn!(
                    subsystem = "api",
                    component = "images",
                    image_url = %image_url,
                    error = %e,
                    "Failed to read image blob"
                );
                continue;
            }
        };
        images.push(TaggedImage {
            mime_type: detect_content_type(&data).to_string(),
            base64: base64::engine::general_purpose::STANDARD.encode(&data),
            image_url,
            tags: labels,
        });
    }

    info!(
        subsystem = "api",
        component = "images",
        op = "images_by_tag",
        tag = %tag,
        result_count = images.len(),
        "Tag search served"
    );
    Ok(Json(images))
}

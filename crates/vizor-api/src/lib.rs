//! # vizor-api
//!
//! HTTP surface for vizor: image upload, single-provider and comparative
//! object detection, persisted comparisons, tag search and video labels.

pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use vizor_core::ImageRecordRepository;
use vizor_db::StorageBackend;
use vizor_inference::ProviderRegistry;
use vizor_search::TagSearchEngine;

pub use config::ServerConfig;
pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub providers: ProviderRegistry,
    pub records: Arc<dyn ImageRecordRepository>,
    pub search: TagSearchEngine,
    pub blobs: Arc<dyn StorageBackend>,
    /// Prefix of image URLs handed to clients.
    pub public_base_url: String,
}

impl AppState {
    pub fn new(
        providers: ProviderRegistry,
        records: Arc<dyn ImageRecordRepository>,
        blobs: Arc<dyn StorageBackend>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            providers,
            search: TagSearchEngine::new(records.clone()),
            records,
            blobs,
            public_base_url: public_base_url.into(),
        }
    }
}

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Invalid CORS origin '{}': {}", o, e);
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// Build the application router with middleware.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    use handlers::{detect, health, images, video};

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/upload", post(images::upload_image))
        .route("/api/detect-vision", post(detect::detect_vision))
        .route("/api/detect-vertex", post(detect::detect_vertex))
        .route("/api/detect-gemini", post(detect::detect_gemini))
        .route("/api/compare", post(detect::compare))
        .route("/api/save-to-firestore", post(images::save_record))
        .route("/api/records", post(images::save_record))
        .route("/api/images-by-tag/:tag", get(images::images_by_tag))
        .route("/api/images/*path", get(images::get_image))
        .route("/api/detect-video", post(video::detect_video))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.allowed_origins))
                .layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .with_state(state)
}

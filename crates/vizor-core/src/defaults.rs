//! Centralized default constants for vizor.
//!
//! All crates reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// DETECTION
// =============================================================================

/// Minimum confidence requested from providers that accept a threshold.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Maximum detections requested per image.
pub const MAX_RESULTS: u32 = 10;

/// Label used when a provider object carries no name.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Number of vertices in a normalized bounding polygon.
pub const POLYGON_VERTICES: usize = 4;

// =============================================================================
// PROVIDERS
// =============================================================================

/// Cloud Vision API base URL.
pub const VISION_BASE_URL: &str = "https://vision.googleapis.com";

/// Gemini API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default Gemini model.
pub const GEMINI_MODEL: &str = "gemini-2.0-flash-exp";

/// Video Intelligence API base URL.
pub const VIDEO_BASE_URL: &str = "https://videointelligence.googleapis.com";

/// Default Vertex AI region.
pub const VERTEX_LOCATION: &str = "us-central1";

/// Per-request provider timeout in seconds.
pub const PROVIDER_TIMEOUT_SECS: u64 = 60;

/// Interval between polls of a long-running video annotation.
pub const VIDEO_POLL_INTERVAL_SECS: u64 = 5;

/// Give up on a video annotation after this many seconds.
pub const VIDEO_POLL_TIMEOUT_SECS: u64 = 600;

/// MIME type sent alongside inline images to the multimodal model.
pub const INLINE_IMAGE_MIME: &str = "image/jpeg";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 8080;

/// Default maximum upload size (50 MB).
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Blob path prefix for uploaded images.
pub const IMAGE_PREFIX: &str = "images";

/// Default local blob storage directory.
pub const STORAGE_PATH: &str = "./data/blobs";

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

pub const ENV_VISION_API_KEY: &str = "VISION_API_KEY";
pub const ENV_VISION_BASE_URL: &str = "VISION_BASE_URL";
pub const ENV_GOOGLE_ACCESS_TOKEN: &str = "GOOGLE_ACCESS_TOKEN";
pub const ENV_VERTEX_PROJECT_ID: &str = "VERTEX_PROJECT_ID";
pub const ENV_VERTEX_ENDPOINT_ID: &str = "VERTEX_ENDPOINT_ID";
pub const ENV_VERTEX_LOCATION: &str = "VERTEX_LOCATION";
pub const ENV_VERTEX_BASE_URL: &str = "VERTEX_BASE_URL";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const ENV_GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";
pub const ENV_VIDEO_BASE_URL: &str = "VIDEO_BASE_URL";
pub const ENV_CONFIDENCE_THRESHOLD: &str = "CONFIDENCE_THRESHOLD";
pub const ENV_MAX_RESULTS: &str = "MAX_RESULTS";
pub const ENV_PROVIDER_TIMEOUT_SECS: &str = "PROVIDER_TIMEOUT_SECS";
pub const ENV_CONFIG_PATH: &str = "VIZOR_CONFIG";

//! Core traits for vizor abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// DOCUMENT STORE
// =============================================================================

/// Document store for persisted comparisons.
///
/// Records are immutable once written and are only queried by full scan.
#[async_trait]
pub trait ImageRecordRepository: Send + Sync {
    /// Persist a new record and return its opaque id.
    async fn add(&self, record: NewImageRecord) -> Result<Uuid>;

    /// Return every stored record in insertion order.
    async fn scan(&self) -> Result<Vec<ImageRecord>>;
}

// =============================================================================
// PROVIDER TRAITS
// =============================================================================

/// Backend for detecting objects in a single image.
#[async_trait]
pub trait DetectionProvider: Send + Sync {
    /// Which provider this backend talks to.
    fn provider(&self) -> Provider;

    /// Run detection on a base64-encoded image and return normalized records.
    async fn detect(&self, image_base64: &str) -> Result<Vec<DetectionRecord>>;
}

/// Backend for segment-level video labeling.
#[async_trait]
pub trait VideoLabelProvider: Send + Sync {
    /// Annotate raw video bytes.
    async fn annotate(&self, video_data: &[u8]) -> Result<Vec<VideoLabel>>;
}

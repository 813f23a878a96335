//! # vizor-inference
//!
//! Object-detection provider clients for vizor.
//!
//! This crate provides:
//! - Response normalization from every provider shape to [`DetectionRecord`]
//! - Cloud Vision, Vertex AI endpoint and Gemini detection clients
//! - Video label annotation with long-running operation polling
//! - Concurrent multi-provider comparison
//! - Provider configuration from environment or TOML
//!
//! # Example
//!
//! ```rust,no_run
//! use vizor_inference::{compare_all, ProviderRegistry, ProvidersConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ProvidersConfig::load().unwrap();
//!     let registry = ProviderRegistry::from_config(&config);
//!     let report = compare_all(&registry.detection_providers(), "aW1hZ2U=").await;
//!     println!("{} providers answered", report.results.len());
//! }
//! ```

pub mod compare;
pub mod config;
pub mod gemini;
pub mod normalize;
pub mod provider;
mod transport;
pub mod vertex;
pub mod video;
pub mod vision;

// Re-export core types
pub use vizor_core::*;

pub use compare::{compare_all, ComparisonReport};
pub use config::{
    ConfigError, Credential, GeminiConfig, ProviderConfig, ProvidersConfig, VertexConfig,
    VideoConfig,
};
pub use gemini::GeminiClient;
pub use normalize::{extract_json_span, normalize, NormalizeError, ProviderResponse};
pub use provider::ProviderRegistry;
pub use vertex::VertexEndpointClient;
pub use video::VideoLabelClient;
pub use vision::CloudVisionClient;

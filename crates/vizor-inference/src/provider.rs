//! Registry of configured detection and video providers.
//!
//! Built once at startup from [`ProvidersConfig`]. Every client shares a
//! single `reqwest::Client` so connection pools are reused across
//! providers. A provider with no configuration section is simply absent.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use vizor_core::{DetectionProvider, Error, Provider, Result, VideoLabelProvider};

use crate::config::ProvidersConfig;
use crate::gemini::GeminiClient;
use crate::vertex::VertexEndpointClient;
use crate::video::VideoLabelClient;
use crate::vision::CloudVisionClient;

// ---------------------------------------------------------------------------
// Provider registry
// ---------------------------------------------------------------------------

/// Configured providers, keyed by [`Provider`].
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    detectors: BTreeMap<Provider, Arc<dyn DetectionProvider>>,
    video: Option<Arc<dyn VideoLabelProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build clients for every configured section.
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let client = reqwest::Client::new();
        let mut registry = Self::new();

        if let Some(ref vision) = config.vision {
            registry.register(Arc::new(CloudVisionClient::with_client(
                vision.clone(),
                client.clone(),
            )));
        }
        if let Some(ref vertex) = config.vertex {
            registry.register(Arc::new(VertexEndpointClient::with_client(
                vertex.clone(),
                client.clone(),
            )));
        }
        if let Some(ref gemini) = config.gemini {
            registry.register(Arc::new(GeminiClient::with_client(
                gemini.clone(),
                client.clone(),
            )));
        }
        if let Some(ref video) = config.video {
            registry = registry.with_video(Arc::new(VideoLabelClient::with_client(
                video.clone(),
                client,
            )));
        }

        info!(
            subsystem = "inference",
            component = "registry",
            providers = ?registry.configured(),
            video = registry.video.is_some(),
            "Provider registry initialized"
        );
        registry
    }

    /// Register a detection provider, replacing any previous one of the same kind.
    pub fn register(&mut self, provider: Arc<dyn DetectionProvider>) {
        self.detectors.insert(provider.provider(), provider);
    }

    /// Set the video label provider.
    pub fn with_video(mut self, provider: Arc<dyn VideoLabelProvider>) -> Self {
        self.video = Some(provider);
        self
    }

    /// Look up a configured detection provider.
    pub fn get(&self, provider: Provider) -> Option<Arc<dyn DetectionProvider>> {
        self.detectors.get(&provider).cloned()
    }

    /// Like [`get`](Self::get) but reports an unconfigured provider as an error.
    pub fn require(&self, provider: Provider) -> Result<Arc<dyn DetectionProvider>> {
        self.get(provider).ok_or_else(|| {
            Error::Config(format!("{} provider is not configured", provider))
        })
    }

    /// All configured detection providers in display order.
    pub fn detection_providers(&self) -> Vec<Arc<dyn DetectionProvider>> {
        self.detectors.values().cloned().collect()
    }

    /// The configured video label provider, if any.
    pub fn video(&self) -> Option<Arc<dyn VideoLabelProvider>> {
        self.video.clone()
    }

    /// Which detection providers are configured.
    pub fn configured(&self) -> Vec<Provider> {
        self.detectors.keys().copied().collect()
    }
}

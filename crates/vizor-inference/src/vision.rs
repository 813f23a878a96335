//! Cloud Vision object localization client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use vizor_core::defaults::VISION_BASE_URL;
use vizor_core::{DetectionProvider, DetectionRecord, Error, Provider, Result};

use crate::config::ProviderConfig;
use crate::normalize::normalize;
use crate::transport::send_for_text;

/// Client for the `images:annotate` endpoint with `OBJECT_LOCALIZATION`.
pub struct CloudVisionClient {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl CloudVisionClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: ProviderConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn annotate_url(&self) -> String {
        format!(
            "{}/v1/images:annotate",
            self.config.base_url_or(VISION_BASE_URL)
        )
    }
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: Vec<AnnotateImageRequest<'a>>,
}

#[derive(Serialize)]
struct AnnotateImageRequest<'a> {
    image: ImageContent<'a>,
    features: Vec<Feature>,
}

#[derive(Serialize)]
struct ImageContent<'a> {
    content: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    max_results: u32,
}

/// A 200 response can still carry a per-image error.
fn per_image_error(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("responses")?
        .get(0)?
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl DetectionProvider for CloudVisionClient {
    fn provider(&self) -> Provider {
        Provider::Vision
    }

    async fn detect(&self, image_base64: &str) -> Result<Vec<DetectionRecord>> {
        let payload = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: image_base64,
                },
                features: vec![Feature {
                    kind: "OBJECT_LOCALIZATION",
                    max_results: self.config.max_results,
                }],
            }],
        };

        let url = self.annotate_url();
        debug!(
            subsystem = "inference",
            component = "vision",
            op = "detect",
            url = %url,
            payload_len = image_base64.len(),
            "Sending annotate request"
        );

        let request = self.config.credential.apply(self.client.post(&url).json(&payload));
        let body = send_for_text(
            "Vision",
            request,
            Duration::from_secs(self.config.timeout_secs),
        )
        .await?;

        if let Some(message) = per_image_error(&body) {
            return Err(Error::Transport(format!("Vision API error: {}", message)));
        }

        Ok(normalize(Provider::Vision, &body)?)
    }
}

//! Gemini multimodal detection client.
//!
//! The model is prompted to answer with the same parallel-array JSON shape
//! a Vertex endpoint returns; its free-text answer is then normalized.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vizor_core::defaults::{GEMINI_BASE_URL, INLINE_IMAGE_MIME};
use vizor_core::{DetectionProvider, DetectionRecord, Error, Provider, Result};

use crate::config::GeminiConfig;
use crate::normalize::normalize;
use crate::transport::send_for_text;

/// Instruction sent alongside the image.
pub const DETECTION_PROMPT: &str = r#"List all objects in this image. For each object, include:
- Label (e.g., "person")
- Confidence score
- Normalized bounding box in the format [xmin, xmax, ymin, ymax]

Respond with JSON in the following structure:
{
  "predictions": [
    {
      "confidences": [ ... ],
      "displayNames": [ ... ],
      "bboxes": [ [xmin, xmax, ymin, ymax], ... ]
    }
  ]
}"#;

/// Client for `models/{model}:generateContent`.
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: GeminiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.provider.base_url_or(GEMINI_BASE_URL),
            self.config.model
        )
    }

    /// Send the prompt and image and return the model's text answer.
    pub async fn generate_text(&self, image_base64: &str) -> Result<String> {
        let payload = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: DETECTION_PROMPT,
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: INLINE_IMAGE_MIME,
                            data: image_base64,
                        },
                    },
                ],
            }],
        };

        let url = self.generate_url();
        debug!(
            subsystem = "inference",
            component = "gemini",
            op = "generate",
            model = %self.config.model,
            "Sending generateContent request"
        );

        let request = self
            .config
            .provider
            .credential
            .apply(self.client.post(&url).json(&payload));
        let body = send_for_text(
            "Gemini",
            request,
            Duration::from_secs(self.config.provider.timeout_secs),
        )
        .await?;

        let response: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            Error::MalformedResponse(format!("Failed to parse Gemini response: {}", e))
        })?;
        let text = response.text().ok_or_else(|| {
            Error::MalformedResponse("Failed to extract text from Gemini response".to_string())
        })?;

        debug!(
            subsystem = "inference",
            component = "gemini",
            response_len = text.len(),
            "Raw Gemini response text received"
        );
        Ok(text)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl DetectionProvider for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn detect(&self, image_base64: &str) -> Result<Vec<DetectionRecord>> {
        let text = self.generate_text(image_base64).await?;
        Ok(normalize(Provider::Gemini, &text)?)
    }
}

//! Vertex AI custom-trained endpoint client (AutoML image object detection).

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use vizor_core::{DetectionProvider, DetectionRecord, Provider, Result};

use crate::config::VertexConfig;
use crate::normalize::normalize;
use crate::transport::send_for_text;

/// Client for a deployed Vertex AI endpoint's `:predict` method.
pub struct VertexEndpointClient {
    config: VertexConfig,
    client: reqwest::Client,
}

impl VertexEndpointClient {
    pub fn new(config: VertexConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: VertexConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: Vec<PredictInstance<'a>>,
    parameters: PredictParameters,
}

#[derive(Serialize)]
struct PredictInstance<'a> {
    content: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    confidence_threshold: f32,
    max_predictions: u32,
}

#[async_trait]
impl DetectionProvider for VertexEndpointClient {
    fn provider(&self) -> Provider {
        Provider::Vertex
    }

    async fn detect(&self, image_base64: &str) -> Result<Vec<DetectionRecord>> {
        let payload = PredictRequest {
            instances: vec![PredictInstance {
                content: image_base64,
            }],
            parameters: PredictParameters {
                confidence_threshold: self.config.provider.confidence_threshold,
                max_predictions: self.config.provider.max_results,
            },
        };

        let url = self.config.predict_url();
        debug!(
            subsystem = "inference",
            component = "vertex",
            op = "detect",
            url = %url,
            "Sending prediction request"
        );

        let request = self
            .config
            .provider
            .credential
            .apply(self.client.post(&url).json(&payload));
        let body = send_for_text(
            "Vertex AI",
            request,
            Duration::from_secs(self.config.provider.timeout_secs),
        )
        .await?;

        let records = normalize(Provider::Vertex, &body)?;
        info!(
            subsystem = "inference",
            component = "vertex",
            op = "detect",
            result_count = records.len(),
            "Vertex prediction processed"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credential, ProviderConfig};
    use vizor_core::Error;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> VertexConfig {
        VertexConfig {
            provider: ProviderConfig::new(base_url, Credential::BearerToken("tok".to_string())),
            project_id: "proj".to_string(),
            endpoint_id: "42".to_string(),
            location: "us-central1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_detect_sends_parameters_and_normalizes() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(
                "/v1/projects/proj/locations/us-central1/endpoints/42:predict",
            ))
            .and(header("Authorization", "Bearer tok"))
            .and(body_json(serde_json::json!({
                "instances": [{"content": "aW1n"}],
                "parameters": {"confidenceThreshold": 0.5, "maxPredictions": 10}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [{
                    "ids": ["1", "2"],
                    "displayNames": ["cat", "dog"],
                    "confidences": [0.9, 0.4],
                    "bboxes": [[0.1, 0.5, 0.1, 0.5], [0.6, 0.9, 0.6, 0.9]]
                }],
                "deployedModelId": "7"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = VertexEndpointClient::new(config(mock_server.uri()));
        let records = client.detect("aW1n").await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "cat");
        assert_eq!(records[0].bounding_poly[1].x, 0.5);
        assert_eq!(records[1].score, 0.4);
    }

    #[tokio::test]
    async fn test_detect_without_predictions_is_empty() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;

        let client = VertexEndpointClient::new(config(mock_server.uri()));
        assert!(client.detect("aW1n").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detect_error_status_is_transport_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"code": 404, "message": "Endpoint not found.", "status": "NOT_FOUND"}
            })))
            .mount(&mock_server)
            .await;

        let client = VertexEndpointClient::new(config(mock_server.uri()));
        let err = client.detect("aW1n").await.unwrap_err();
        assert!(matches!(err, Error::Transport(ref m) if m.contains("Endpoint not found.")));
    }
}

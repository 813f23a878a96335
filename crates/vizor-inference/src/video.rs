//! Video Intelligence label detection client.
//!
//! Annotation is a long-running operation: the request returns an operation
//! name which is polled until it reports `done`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use vizor_core::defaults::VIDEO_BASE_URL;
use vizor_core::{Error, Result, VideoLabel, VideoLabelProvider, VideoSegment};

use crate::config::VideoConfig;
use crate::transport::send_for_text;

/// Client for `videos:annotate` with `LABEL_DETECTION`.
pub struct VideoLabelClient {
    config: VideoConfig,
    client: reqwest::Client,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl VideoLabelClient {
    pub fn new(config: VideoConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: VideoConfig, client: reqwest::Client) -> Self {
        let poll_interval = Duration::from_secs(config.poll_interval_secs);
        let poll_timeout = Duration::from_secs(config.poll_timeout_secs);
        Self {
            config,
            client,
            poll_interval,
            poll_timeout,
        }
    }

    /// Override the delay between operation polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override how long to wait for the operation to finish.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    fn base_url(&self) -> String {
        self.config.provider.base_url_or(VIDEO_BASE_URL)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.provider.timeout_secs)
    }

    async fn start(&self, video_data: &[u8]) -> Result<String> {
        let input_content = base64::engine::general_purpose::STANDARD.encode(video_data);
        let payload = AnnotateVideoRequest {
            input_content: &input_content,
            features: &["LABEL_DETECTION"],
        };

        let url = format!("{}/v1/videos:annotate", self.base_url());
        let request = self
            .config
            .provider
            .credential
            .apply(self.client.post(&url).json(&payload));
        let body = send_for_text("Video Intelligence", request, self.request_timeout()).await?;

        let operation = parse_operation(&body)?;
        operation.name.ok_or_else(|| {
            Error::MalformedResponse("Video annotation returned no operation name".to_string())
        })
    }

    async fn poll(&self, name: &str) -> Result<Operation> {
        let url = format!("{}/v1/{}", self.base_url(), name);
        let deadline = Instant::now() + self.poll_timeout;

        loop {
            let request = self.config.provider.credential.apply(self.client.get(&url));
            let body =
                send_for_text("Video Intelligence", request, self.request_timeout()).await?;
            let operation = parse_operation(&body)?;

            if operation.done {
                return Ok(operation);
            }
            if Instant::now() >= deadline {
                return Err(Error::Transport(format!(
                    "Video annotation {} did not finish within {}s",
                    name,
                    self.poll_timeout.as_secs()
                )));
            }

            debug!(
                subsystem = "inference",
                component = "video",
                op = "poll",
                operation = name,
                "Video annotation still running"
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateVideoRequest<'a> {
    input_content: &'a str,
    features: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: Option<String>,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<AnnotateVideoResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateVideoResponse {
    #[serde(default)]
    annotation_results: Vec<AnnotationResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotationResult {
    #[serde(default)]
    segment_label_annotations: Vec<LabelAnnotation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelAnnotation {
    entity: Option<Entity>,
    #[serde(default)]
    category_entities: Vec<Entity>,
    #[serde(default)]
    segments: Vec<LabelSegment>,
}

#[derive(Debug, Deserialize)]
struct Entity {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct LabelSegment {
    #[serde(default)]
    segment: TimeSegment,
    #[serde(default)]
    confidence: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeSegment {
    start_time_offset: Option<Offset>,
    end_time_offset: Option<Offset>,
}

/// A protobuf `Duration`: `"12.5s"` over REST, `{seconds, nanos}` elsewhere.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Offset {
    Text(String),
    Parts {
        #[serde(default)]
        seconds: SecondsField,
        #[serde(default)]
        nanos: i64,
    },
}

/// `int64` seconds may arrive as a JSON string or number.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum SecondsField {
    #[default]
    Missing,
    Number(i64),
    Text(String),
}

impl Offset {
    fn as_secs(&self) -> f64 {
        match self {
            Offset::Text(s) => s.trim_end_matches('s').parse().unwrap_or(0.0),
            Offset::Parts { seconds, nanos } => {
                let secs = match seconds {
                    SecondsField::Missing => 0.0,
                    SecondsField::Number(n) => *n as f64,
                    SecondsField::Text(s) => s.parse().unwrap_or(0.0),
                };
                secs + *nanos as f64 / 1e9
            }
        }
    }
}

fn offset_secs(offset: &Option<Offset>) -> f64 {
    offset.as_ref().map(Offset::as_secs).unwrap_or(0.0)
}

impl From<LabelAnnotation> for VideoLabel {
    fn from(annotation: LabelAnnotation) -> Self {
        VideoLabel {
            description: annotation.entity.map(|e| e.description).unwrap_or_default(),
            category_descriptions: annotation
                .category_entities
                .into_iter()
                .map(|e| e.description)
                .collect(),
            segments: annotation
                .segments
                .into_iter()
                .map(|s| VideoSegment {
                    start_time: offset_secs(&s.segment.start_time_offset),
                    end_time: offset_secs(&s.segment.end_time_offset),
                    confidence: s.confidence,
                })
                .collect(),
        }
    }
}

/// Extract segment labels from a finished operation.
fn labels_from_operation(operation: Operation) -> Result<Vec<VideoLabel>> {
    if let Some(error) = operation.error {
        return Err(Error::Transport(format!(
            "Video annotation failed: {}",
            error.message
        )));
    }

    Ok(operation
        .response
        .and_then(|r| r.annotation_results.into_iter().next())
        .map(|r| {
            r.segment_label_annotations
                .into_iter()
                .map(VideoLabel::from)
                .collect()
        })
        .unwrap_or_default())
}

#[async_trait]
impl VideoLabelProvider for VideoLabelClient {
    async fn annotate(&self, video_data: &[u8]) -> Result<Vec<VideoLabel>> {
        let start = Instant::now();
        let name = self.start(video_data).await?;
        debug!(
            subsystem = "inference",
            component = "video",
            op = "annotate",
            operation = %name,
            payload_len = video_data.len(),
            "Video annotation started"
        );

        let operation = self.poll(&name).await?;
        let labels = labels_from_operation(operation)?;

        info!(
            subsystem = "inference",
            component = "video",
            op = "annotate",
            result_count = labels.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Video annotation complete"
        );
        Ok(labels)
    }
}

fn parse_operation(body: &str) -> Result<Operation> {
    serde_json::from_str(body).map_err(|e| {
        Error::MalformedResponse(format!("Invalid video annotation operation: {}", e))
    })
}

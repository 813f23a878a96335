//! Normalization of provider-specific detection payloads.
//!
//! Three response shapes are folded into [`DetectionRecord`]:
//!
//! - **vision**: a list of objects that already carry a name, a score and a
//!   four-vertex normalized polygon.
//! - **vertex**: `predictions: [{displayNames, confidences, bboxes}]`, three
//!   parallel arrays per entry with boxes given as `[xmin, xmax, ymin, ymax]`.
//! - **gemini**: free text that embeds the vertex shape as a JSON object.
//!
//! Parallel arrays are validated once at this boundary and turned into typed
//! [`Detection`] tuples. A length mismatch drops the whole prediction entry;
//! an unusable individual item (bad box, missing name, non-numeric score)
//! drops only that item. The same policy applies to vertex and gemini.
//!
//! Only the gemini adapter can fail: when the text holds no `{...}` span or
//! that span is not valid JSON. Every other malformation degrades to fewer
//! records and a warning.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use vizor_core::defaults::{POLYGON_VERTICES, UNKNOWN_LABEL};
use vizor_core::{BoundingBox, Detection, DetectionRecord, Provider, Vertex};

/// Failure to recover a JSON payload from free-text model output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("No JSON object found in model response")]
    NoJsonFound,

    #[error("Invalid JSON in model response: {0}")]
    InvalidJson(String),
}

impl From<NormalizeError> for vizor_core::Error {
    fn from(e: NormalizeError) -> Self {
        vizor_core::Error::MalformedResponse(e.to_string())
    }
}

/// Raw provider payload, tagged by provider.
///
/// Items are kept as untyped JSON so that one malformed item can be dropped
/// without rejecting its siblings.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResponse {
    /// Localized object annotations.
    Vision(Vec<Value>),
    /// Prediction entries with parallel arrays.
    Vertex(Vec<Value>),
    /// Prediction entries recovered from model text.
    Gemini(Vec<Value>),
}

impl ProviderResponse {
    /// Parse a provider's raw response body.
    ///
    /// `raw` is the JSON body for vision and vertex and the model's text
    /// output for gemini.
    pub fn parse(provider: Provider, raw: &str) -> Result<Self, NormalizeError> {
        match provider {
            Provider::Vision => Ok(Self::Vision(vision_objects(raw))),
            Provider::Vertex => Ok(Self::Vertex(vertex_predictions(raw))),
            Provider::Gemini => {
                let span = extract_json_span(raw).ok_or(NormalizeError::NoJsonFound)?;
                let value: Value = serde_json::from_str(span)
                    .map_err(|e| NormalizeError::InvalidJson(e.to_string()))?;
                Ok(Self::Gemini(predictions_of(Provider::Gemini, &value)))
            }
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            Self::Vision(_) => Provider::Vision,
            Self::Vertex(_) => Provider::Vertex,
            Self::Gemini(_) => Provider::Gemini,
        }
    }

    /// Convert into canonical records, dropping malformed items.
    pub fn into_records(self) -> Vec<DetectionRecord> {
        let provider = self.provider();
        let records: Vec<DetectionRecord> = match self {
            Self::Vision(objects) => objects
                .iter()
                .enumerate()
                .filter_map(|(idx, obj)| vision_record(idx, obj))
                .collect(),
            Self::Vertex(entries) | Self::Gemini(entries) => entries
                .iter()
                .enumerate()
                .flat_map(|(idx, entry)| {
                    prediction_detections(provider, idx, entry).unwrap_or_default()
                })
                .map(Detection::into_record)
                .collect(),
        };

        debug!(
            subsystem = "inference",
            component = "normalize",
            provider = %provider,
            result_count = records.len(),
            "Normalized provider response"
        );
        records
    }
}

/// Normalize one provider's raw response into canonical records.
pub fn normalize(provider: Provider, raw: &str) -> Result<Vec<DetectionRecord>, NormalizeError> {
    Ok(ProviderResponse::parse(provider, raw)?.into_records())
}

/// Greedy first-`{` to last-`}` span of `text`.
///
/// This is not a balanced-brace parse: text holding several JSON objects
/// yields one span covering all of them.
pub fn extract_json_span(text: &str) -> Option<&str> {
    static JSON_SPAN: OnceLock<Option<Regex>> = OnceLock::new();
    JSON_SPAN
        .get_or_init(|| Regex::new(r"\{[\s\S]*\}").ok())
        .as_ref()?
        .find(text)
        .map(|m| m.as_str())
}

// =============================================================================
// VISION
// =============================================================================

#[derive(Debug, Deserialize)]
struct VisionObject {
    #[serde(default, alias = "displayName")]
    name: Option<String>,
    #[serde(default, alias = "confidence")]
    score: Option<f64>,
    #[serde(rename = "boundingPoly")]
    bounding_poly: PolygonSource,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PolygonSource {
    Wrapped {
        #[serde(rename = "normalizedVertices")]
        normalized_vertices: Vec<VertexSource>,
    },
    Bare(Vec<VertexSource>),
}

/// The annotation API omits coordinates equal to zero.
#[derive(Debug, Deserialize)]
struct VertexSource {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

fn vision_objects(raw: &str) -> Vec<Value> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(
                subsystem = "inference",
                component = "normalize",
                provider = "vision",
                error = %e,
                "Vision response is not valid JSON"
            );
            return Vec::new();
        }
    };

    let objects = match &value {
        Value::Array(items) => Some(items),
        Value::Object(map) => map
            .get("responses")
            .and_then(|r| r.get(0))
            .unwrap_or(&value)
            .get("localizedObjectAnnotations")
            .and_then(Value::as_array),
        _ => None,
    };

    // An image with no detected objects has no annotation list at all.
    objects.cloned().unwrap_or_default()
}

fn vision_record(idx: usize, obj: &Value) -> Option<DetectionRecord> {
    let parsed: VisionObject = match serde_json::from_value(obj.clone()) {
        Ok(o) => o,
        Err(e) => {
            warn!(
                subsystem = "inference",
                component = "normalize",
                provider = "vision",
                index = idx,
                error = %e,
                "Skipping malformed vision object"
            );
            return None;
        }
    };

    let vertices = match parsed.bounding_poly {
        PolygonSource::Wrapped {
            normalized_vertices,
        } => normalized_vertices,
        PolygonSource::Bare(vertices) => vertices,
    };
    let polygon: [Vertex; POLYGON_VERTICES] = match vertices
        .iter()
        .map(|v| Vertex::new(v.x, v.y))
        .collect::<Vec<_>>()
        .try_into()
    {
        Ok(p) => p,
        Err(v) => {
            warn!(
                subsystem = "inference",
                component = "normalize",
                provider = "vision",
                index = idx,
                vertex_count = v.len(),
                "Skipping vision object without a four-vertex polygon"
            );
            return None;
        }
    };

    let name = parsed
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string());

    Some(DetectionRecord {
        name,
        score: parsed.score.unwrap_or(0.0),
        bounding_poly: polygon,
    })
}

// =============================================================================
// PARALLEL-ARRAY PREDICTIONS (vertex, gemini)
// =============================================================================

fn vertex_predictions(raw: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => predictions_of(Provider::Vertex, &value),
        Err(e) => {
            warn!(
                subsystem = "inference",
                component = "normalize",
                provider = "vertex",
                error = %e,
                "Vertex response is not valid JSON"
            );
            Vec::new()
        }
    }
}

fn predictions_of(provider: Provider, value: &Value) -> Vec<Value> {
    match value.get("predictions").and_then(Value::as_array) {
        Some(entries) => entries.clone(),
        None => {
            warn!(
                subsystem = "inference",
                component = "normalize",
                provider = %provider,
                "No predictions array found in response"
            );
            Vec::new()
        }
    }
}

fn array_field<'a>(entry: &'a serde_json::Map<String, Value>, key: &str) -> &'a [Value] {
    entry
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Validate one prediction entry into typed detections.
///
/// Returns `None` when the entry is not an object or its three arrays differ
/// in length. Unusable individual items are skipped.
pub fn prediction_detections(
    provider: Provider,
    idx: usize,
    entry: &Value,
) -> Option<Vec<Detection>> {
    let Some(fields) = entry.as_object() else {
        warn!(
            subsystem = "inference",
            component = "normalize",
            provider = %provider,
            index = idx,
            "Skipping prediction with unexpected structure"
        );
        return None;
    };

    let names = array_field(fields, "displayNames");
    let confidences = array_field(fields, "confidences");
    let bboxes = array_field(fields, "bboxes");

    if names.len() != confidences.len() || names.len() != bboxes.len() {
        warn!(
            subsystem = "inference",
            component = "normalize",
            provider = %provider,
            index = idx,
            names = names.len(),
            scores = confidences.len(),
            boxes = bboxes.len(),
            "Prediction array length mismatch"
        );
        return None;
    }

    let detections = names
        .iter()
        .zip(confidences)
        .zip(bboxes)
        .enumerate()
        .filter_map(|(item, ((name, score), bbox))| {
            let detection = detection_from_parts(name, score, bbox);
            if detection.is_none() {
                warn!(
                    subsystem = "inference",
                    component = "normalize",
                    provider = %provider,
                    index = idx,
                    item,
                    bbox = %bbox,
                    "Skipping invalid prediction item"
                );
            }
            detection
        })
        .collect();

    Some(detections)
}

fn detection_from_parts(name: &Value, score: &Value, bbox: &Value) -> Option<Detection> {
    let name = name.as_str().filter(|n| !n.is_empty())?;
    let score = score.as_f64().filter(|s| s.is_finite())?;
    let values = bbox
        .as_array()?
        .iter()
        .map(Value::as_f64)
        .collect::<Option<Vec<f64>>>()?;
    let bbox = BoundingBox::from_values(&values)?;

    Some(Detection {
        name: name.to_string(),
        score,
        bbox,
    })
}

//! Domain models for vizor.
//!
//! The serialized field names (`name`, `score`, `boundingPoly`, `imageUrl`,
//! `results`, `timestamp`) are consumed by the existing front end and must
//! not change.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

// =============================================================================
// PROVIDERS
// =============================================================================

/// External object-detection service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Vision annotation API (object localization).
    Vision,
    /// Custom-trained Vertex AI endpoint.
    Vertex,
    /// Generative multimodal model.
    Gemini,
}

impl Provider {
    /// Every provider, in display order.
    pub const ALL: [Provider; 3] = [Provider::Vision, Provider::Vertex, Provider::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Vision => "vision",
            Provider::Vertex => "vertex",
            Provider::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vision" => Ok(Provider::Vision),
            "vertex" => Ok(Provider::Vertex),
            "gemini" => Ok(Provider::Gemini),
            other => Err(Error::InvalidInput(format!("Unknown provider: {}", other))),
        }
    }
}

// =============================================================================
// DETECTIONS
// =============================================================================

/// A point in normalized image coordinates (fractions of width/height).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box as emitted by the parallel-array providers:
/// `[xmin, xmax, ymin, ymax]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl BoundingBox {
    /// Build a box from the first four values of `[xmin, xmax, ymin, ymax, ..]`.
    ///
    /// Returns `None` for fewer than four values or any non-finite value.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.len() < 4 || values[..4].iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(Self {
            xmin: values[0],
            xmax: values[1],
            ymin: values[2],
            ymax: values[3],
        })
    }

    /// Corners in top-left, top-right, bottom-right, bottom-left order.
    pub fn corners(&self) -> [Vertex; 4] {
        [
            Vertex::new(self.xmin, self.ymin),
            Vertex::new(self.xmax, self.ymin),
            Vertex::new(self.xmax, self.ymax),
            Vertex::new(self.xmin, self.ymax),
        ]
    }
}

/// Canonical normalized detection shared by every provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub name: String,
    pub score: f64,
    /// Quadrilateral in top-left, top-right, bottom-right, bottom-left order.
    #[serde(rename = "boundingPoly")]
    pub bounding_poly: [Vertex; 4],
}

/// A validated `{name, score, box}` tuple from a parallel-array provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub name: String,
    pub score: f64,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn into_record(self) -> DetectionRecord {
        DetectionRecord {
            bounding_poly: self.bbox.corners(),
            name: self.name,
            score: self.score,
        }
    }
}

impl From<Detection> for DetectionRecord {
    fn from(d: Detection) -> Self {
        d.into_record()
    }
}

// =============================================================================
// PERSISTED IMAGE RECORDS
// =============================================================================

/// Label and confidence kept at persistence time (boxes are dropped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDetection {
    pub name: String,
    pub score: f64,
}

impl From<&DetectionRecord> for StoredDetection {
    fn from(r: &DetectionRecord) -> Self {
        Self {
            name: r.name.clone(),
            score: r.score,
        }
    }
}

/// Per-provider results keyed by provider name.
pub type ProviderResults = BTreeMap<String, Vec<StoredDetection>>;

/// One persisted multi-provider comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: Uuid,
    pub image_url: String,
    pub results: ProviderResults,
    pub timestamp: DateTime<Utc>,
}

impl ImageRecord {
    /// Distinct detected labels across providers, first spelling kept.
    ///
    /// Labels differing only in case count as one.
    pub fn labels(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.results
            .values()
            .flatten()
            .filter(|d| seen.insert(d.name.to_lowercase()))
            .map(|d| d.name.clone())
            .collect()
    }
}

/// Request for persisting a new image record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewImageRecord {
    pub image_url: String,
    pub results: ProviderResults,
}

impl NewImageRecord {
    /// Build a record from full detection results, dropping bounding boxes.
    pub fn from_detections(
        image_url: impl Into<String>,
        results: &BTreeMap<String, Vec<DetectionRecord>>,
    ) -> Self {
        let results = results
            .iter()
            .map(|(provider, records)| {
                (
                    provider.clone(),
                    records.iter().map(StoredDetection::from).collect(),
                )
            })
            .collect();
        Self {
            image_url: image_url.into(),
            results,
        }
    }
}

/// Ranked tag search hit. Derived per query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagMatch {
    pub image_url: String,
    pub max_score: f64,
    /// Every label detected in the image, not only the matched one.
    #[serde(default)]
    pub labels: Vec<String>,
}

// =============================================================================
// VIDEO LABELS
// =============================================================================

/// Time span in which a video label was observed. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSegment {
    pub start_time: f64,
    pub end_time: f64,
    pub confidence: f64,
}

/// Segment-level label produced by the video annotation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoLabel {
    pub description: String,
    pub category_descriptions: Vec<String>,
    pub segments: Vec<VideoSegment>,
}

//! Rank stored images by how confidently a tag was detected in them.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use vizor_core::{ImageRecord, ImageRecordRepository, Result, TagMatch};

/// Score every record against `tag` and return matches, best first.
///
/// Labels are compared case-insensitively across all providers. An image's
/// score is its highest matching confidence; images with no positive match
/// are left out. Ties keep the order of `records`.
pub fn rank_by_tag(records: &[ImageRecord], tag: &str) -> Vec<TagMatch> {
    let needle = tag.to_lowercase();

    let mut matches: Vec<TagMatch> = records
        .iter()
        .filter_map(|record| {
            let max_score = record
                .results
                .values()
                .flatten()
                .filter(|d| d.name.to_lowercase() == needle)
                .map(|d| d.score)
                .reduce(f64::max)?;
            (max_score > 0.0).then(|| TagMatch {
                image_url: record.image_url.clone(),
                max_score,
                labels: record.labels(),
            })
        })
        .collect();

    // sort_by is stable
    matches.sort_by(|a, b| b.max_score.total_cmp(&a.max_score));
    matches
}

/// Tag search over an image record store.
#[derive(Clone)]
pub struct TagSearchEngine {
    records: Arc<dyn ImageRecordRepository>,
}

impl TagSearchEngine {
    pub fn new(records: Arc<dyn ImageRecordRepository>) -> Self {
        Self { records }
    }

    /// Ranked matches for `tag`, with scores.
    pub async fn search(&self, tag: &str) -> Result<Vec<TagMatch>> {
        let start = Instant::now();
        let records = self.records.scan().await?;
        let matches = rank_by_tag(&records, tag);

        debug!(
            subsystem = "search",
            component = "tag_search",
            op = "search",
            tag = %tag,
            scanned_count = records.len(),
            result_count = matches.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Tag search complete"
        );
        Ok(matches)
    }

    /// Image URLs whose detections include `tag`, best match first.
    pub async fn search_by_tag(&self, tag: &str) -> Result<Vec<String>> {
        Ok(self
            .search(tag)
            .await?
            .into_iter()
            .map(|m| m.image_url)
            .collect())
    }
}

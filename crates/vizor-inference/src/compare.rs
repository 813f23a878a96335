//! Fan a single image out to several providers concurrently.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use vizor_core::{DetectionProvider, DetectionRecord, NewImageRecord, Provider};

/// Per-provider outcome of one comparison run.
///
/// A provider appears in exactly one of the two maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub results: BTreeMap<Provider, Vec<DetectionRecord>>,
    pub errors: BTreeMap<Provider, String>,
}

impl ComparisonReport {
    /// Providers that returned a result.
    pub fn succeeded(&self) -> impl Iterator<Item = Provider> + '_ {
        self.results.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.errors.is_empty()
    }

    /// Results keyed by provider name, the shape persisted with an image.
    pub fn results_by_name(&self) -> BTreeMap<String, Vec<DetectionRecord>> {
        self.results
            .iter()
            .map(|(provider, records)| (provider.as_str().to_string(), records.clone()))
            .collect()
    }

    /// Build the document stored for `image_url`.
    pub fn to_image_record(&self, image_url: impl Into<String>) -> NewImageRecord {
        NewImageRecord::from_detections(image_url, &self.results_by_name())
    }
}

/// Run every provider on the same image and collect each outcome.
///
/// One provider failing never affects the others.
pub async fn compare_all(
    providers: &[Arc<dyn DetectionProvider>],
    image_base64: &str,
) -> ComparisonReport {
    let start = Instant::now();

    let outcomes = join_all(providers.iter().map(|p| async move {
        let provider = p.provider();
        let started = Instant::now();
        let outcome = p.detect(image_base64).await;
        (provider, outcome, started.elapsed().as_millis() as u64)
    }))
    .await;

    let mut report = ComparisonReport::default();
    for (provider, outcome, duration_ms) in outcomes {
        match outcome {
            Ok(records) => {
                info!(
                    subsystem = "inference",
                    component = "compare",
                    provider = %provider,
                    result_count = records.len(),
                    duration_ms,
                    "Provider detection complete"
                );
                report.results.insert(provider, records);
            }
            Err(e) => {
                warn!(
                    subsystem = "inference",
                    component = "compare",
                    provider = %provider,
                    duration_ms,
                    error = %e,
                    "Provider detection failed"
                );
                report.errors.insert(provider, e.to_string());
            }
        }
    }

    info!(
        subsystem = "inference",
        component = "compare",
        op = "compare_all",
        provider_count = providers.len(),
        error_count = report.errors.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Comparison complete"
    );
    report
}

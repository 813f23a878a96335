//! Tag search against a populated record store.

use std::collections::BTreeMap;
use std::sync::Arc;

use vizor_core::{DetectionRecord, ImageRecordRepository, NewImageRecord, Vertex};
use vizor_db::InMemoryImageRecordRepository;
use vizor_search::TagSearchEngine;

fn detection(name: &str, score: f64) -> DetectionRecord {
    DetectionRecord {
        name: name.to_string(),
        score,
        bounding_poly: [Vertex::default(); 4],
    }
}

fn comparison(url: &str, provider: &str, detections: Vec<DetectionRecord>) -> NewImageRecord {
    let mut results = BTreeMap::new();
    results.insert(provider.to_string(), detections);
    NewImageRecord::from_detections(url, &results)
}

async fn populated_engine() -> TagSearchEngine {
    let store = Arc::new(InMemoryImageRecordRepository::new());
    store
        .add(comparison("img-1", "vision", vec![detection("Cat", 0.7)]))
        .await
        .unwrap();
    store
        .add(comparison("img-2", "vertex", vec![detection("dog", 0.9)]))
        .await
        .unwrap();
    store
        .add(comparison(
            "img-3",
            "gemini",
            vec![detection("cat", 0.95), detection("sofa", 0.5)],
        ))
        .await
        .unwrap();
    TagSearchEngine::new(store)
}

#[tokio::test]
async fn test_search_by_tag_ranks_best_match_first() {
    let engine = populated_engine().await;
    let urls = engine.search_by_tag("cat").await.unwrap();
    assert_eq!(urls, vec!["img-3", "img-1"]);
}

#[tokio::test]
async fn test_search_by_tag_is_case_insensitive() {
    let engine = populated_engine().await;
    assert_eq!(
        engine.search_by_tag("CAT").await.unwrap(),
        engine.search_by_tag("cat").await.unwrap()
    );
}

#[tokio::test]
async fn test_search_unknown_tag_is_empty() {
    let engine = populated_engine().await;
    assert!(engine.search_by_tag("giraffe").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_reports_scores() {
    let engine = populated_engine().await;
    let matches = engine.search("sofa").await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].image_url, "img-3");
    assert_eq!(matches[0].max_score, 0.5);
}

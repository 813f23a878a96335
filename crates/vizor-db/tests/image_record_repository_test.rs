//! PostgreSQL image record store tests.
//!
//! These run only when `DATABASE_URL` points at a reachable database.

use std::collections::BTreeMap;

use vizor_db::{
    create_pool, ImageRecordRepository, NewImageRecord, PgImageRecordRepository, StoredDetection,
};
use sqlx::PgPool;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../../../migrations/20260301000000_image_record.sql");

async fn setup_test_pool() -> Option<PgPool> {
    let _ = dotenvy::dotenv();
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let pool = create_pool(&database_url)
        .await
        .expect("Failed to create test pool");
    sqlx::raw_sql(SCHEMA)
        .execute(&pool)
        .await
        .expect("Failed to apply schema");
    Some(pool)
}

fn new_record(url: &str, provider: &str, label: &str, score: f64) -> NewImageRecord {
    let mut results = BTreeMap::new();
    results.insert(
        provider.to_string(),
        vec![StoredDetection {
            name: label.to_string(),
            score,
        }],
    );
    NewImageRecord {
        image_url: url.to_string(),
        results,
    }
}

#[tokio::test]
async fn test_add_and_scan_round_trip() {
    let Some(pool) = setup_test_pool().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    let repo = PgImageRecordRepository::new(pool);

    let url = format!("http://test/api/images/images/{}-cat.jpg", Uuid::new_v4());
    let id = repo
        .add(new_record(&url, "vision", "Cat", 0.93))
        .await
        .expect("Failed to add record");

    let records = repo.scan().await.expect("Failed to scan");
    let stored = records
        .iter()
        .find(|r| r.id == id)
        .expect("Stored record should be returned by scan");

    assert_eq!(stored.image_url, url);
    assert_eq!(stored.results["vision"][0].name, "Cat");
    assert_eq!(stored.results["vision"][0].score, 0.93);
}

#[tokio::test]
async fn test_scan_returns_insertion_order() {
    let Some(pool) = setup_test_pool().await else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    let repo = PgImageRecordRepository::new(pool);

    let first = repo
        .add(new_record("http://test/first", "vertex", "dog", 0.5))
        .await
        .unwrap();
    let second = repo
        .add(new_record("http://test/second", "gemini", "dog", 0.6))
        .await
        .unwrap();

    let ids: Vec<Uuid> = repo.scan().await.unwrap().into_iter().map(|r| r.id).collect();
    let first_pos = ids.iter().position(|id| *id == first).unwrap();
    let second_pos = ids.iter().position(|id| *id == second).unwrap();
    assert!(first_pos < second_pos);
}

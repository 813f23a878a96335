//! Image record repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use vizor_core::{Error, ImageRecord, ImageRecordRepository, NewImageRecord, ProviderResults, Result};

/// PostgreSQL implementation of ImageRecordRepository.
///
/// Results are stored as a JSONB document per row, keyed by provider name.
#[derive(Clone)]
pub struct PgImageRecordRepository {
    pool: Pool<Postgres>,
}

impl PgImageRecordRepository {
    /// Create a new PgImageRecordRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageRecordRepository for PgImageRecordRepository {
    async fn add(&self, record: NewImageRecord) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let results = serde_json::to_value(&record.results)?;

        sqlx::query(
            "INSERT INTO image_record (id, image_url, results, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(&record.image_url)
        .bind(results)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "image_records",
            op = "add",
            record_id = %id,
            image_url = %record.image_url,
            "Image record stored"
        );
        Ok(id)
    }

    async fn scan(&self) -> Result<Vec<ImageRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, image_url, results, created_at
            FROM image_record
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row.get("id");
            let value: serde_json::Value = row.get("results");
            // Rows with an unreadable results document are skipped.
            let results: ProviderResults = match serde_json::from_value(value) {
                Ok(results) => results,
                Err(e) => {
                    warn!(
                        subsystem = "database",
                        component = "image_records",
                        record_id = %id,
                        error = %e,
                        "Skipping image record with unreadable results"
                    );
                    continue;
                }
            };
            let created_at: DateTime<Utc> = row.get("created_at");
            records.push(ImageRecord {
                id,
                image_url: row.get("image_url"),
                results,
                timestamp: created_at,
            });
        }

        Ok(records)
    }
}

//! In-process image record store.
//!
//! Used when no `DATABASE_URL` is configured and by tests.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use vizor_core::{ImageRecord, ImageRecordRepository, NewImageRecord, Result};

/// Image records held in memory, returned in insertion order.
#[derive(Default)]
pub struct InMemoryImageRecordRepository {
    records: RwLock<Vec<ImageRecord>>,
}

impl InMemoryImageRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ImageRecordRepository for InMemoryImageRecordRepository {
    async fn add(&self, record: NewImageRecord) -> Result<Uuid> {
        let id = Uuid::now_v7();
        self.records.write().await.push(ImageRecord {
            id,
            image_url: record.image_url,
            results: record.results,
            timestamp: Utc::now(),
        });
        Ok(id)
    }

    async fn scan(&self) -> Result<Vec<ImageRecord>> {
        Ok(self.records.read().await.clone())
    }
}

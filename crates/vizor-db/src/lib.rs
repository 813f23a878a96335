//! # vizor-db
//!
//! Storage layer for vizor.
//!
//! This crate provides:
//! - Connection pool management
//! - The PostgreSQL image record store (results kept as JSONB)
//! - An in-memory image record store for local runs and tests
//! - Blob storage backends (filesystem and in-memory)
//!
//! ## Example
//!
//! ```rust,ignore
//! use vizor_db::{Database, ImageRecordRepository, PoolConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect_with_config(
//!         "postgres://localhost/vizor",
//!         &PoolConfig::from_env(),
//!     )
//!     .await?;
//!     let records = db.image_records.scan().await?;
//!     println!("{} stored comparisons", records.len());
//!     Ok(())
//! }
//! ```

pub mod file_storage;
pub mod image_records;
pub mod memory;
pub mod pool;

// Re-export core types
pub use vizor_core::*;

pub use file_storage::{
    blob_path_from_url, blob_url, detect_content_type, generate_image_path, FilesystemBackend,
    MemoryBackend, StorageBackend,
};
pub use image_records::PgImageRecordRepository;
pub use memory::InMemoryImageRecordRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

/// Database context holding the pool and its repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Persisted multi-provider comparisons.
    pub image_records: PgImageRecordRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            image_records: PgImageRecordRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the given URL with the supplied pool sizing.
    pub async fn connect_with_config(url: &str, config: &PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

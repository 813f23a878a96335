//! Blob storage for uploaded images and videos.
//!
//! Blobs are addressed by a relative path such as
//! `images/0192f1c4-...-cat.jpg`. Image records reference a blob by its
//! public URL, `{public_base}/api/images/{path}`, which the API resolves
//! back to a path when serving bytes.
//!
//! ## Example
//!
//! ```rust,ignore
//! use vizor_db::file_storage::{generate_image_path, FilesystemBackend, StorageBackend};
//!
//! let backend = FilesystemBackend::new("/var/vizor/blobs");
//! let path = generate_image_path("cat.jpg");
//! backend.write(&path, &data).await?;
//! ```

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use vizor_core::defaults::IMAGE_PREFIX;
use vizor_core::{Error, Result};

/// Route prefix under which blobs are served.
pub const BLOB_ROUTE: &str = "/api/images/";

/// Fallback content type when sniffing fails.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Storage backend trait for different storage implementations.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data to the specified path.
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Read data from the specified path.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete data at the specified path.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check if data exists at the specified path.
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Reject absolute paths and `..` components.
fn validate_blob_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::InvalidInput("Blob path cannot be empty".to_string()));
    }
    let safe = Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return Err(Error::InvalidInput(format!("Invalid blob path: {}", path)));
    }
    Ok(())
}

async fn write_and_rename(temp_path: &Path, full_path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp_path, full_path).await
}

/// Filesystem storage backend rooted at a base directory.
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, path: &str) -> Result<PathBuf> {
        validate_blob_path(path)?;
        Ok(self.base_path.join(path))
    }

    /// Check at startup that the base directory is writable.
    pub async fn validate(&self) -> Result<()> {
        let probe = self.base_path.join(".health-check");

        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            Error::Storage(format!("create_dir_all({:?}): {}", self.base_path, e))
        })?;
        fs::write(&probe, b"vizor")
            .await
            .map_err(|e| Error::Storage(format!("write({:?}): {}", probe, e)))?;
        let read_back = fs::read(&probe)
            .await
            .map_err(|e| Error::Storage(format!("read({:?}): {}", probe, e)))?;
        if read_back != b"vizor" {
            return Err(Error::Storage("read-back mismatch".to_string()));
        }
        let _ = fs::remove_file(&probe).await;

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path)?;
        debug!(
            subsystem = "storage",
            component = "filesystem",
            op = "write",
            blob_path = %path,
            size = data.len(),
            "Writing blob"
        );

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "file_storage: create_dir_all failed");
                e
            })?;
        }

        // Atomic write: temp file + rename
        let mut temp_name = full_path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        if let Err(e) = write_and_rename(&temp_path, &full_path, data).await {
            warn!(
                subsystem = "storage",
                component = "filesystem",
                temp_path = %temp_path.display(),
                blob_path = %path,
                error = %e,
                "file_storage: write failed, removing temp file"
            );
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(path)?;
        match fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("Blob {}", path)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path)?;
        if fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full_path = self.full_path(path)?;
        Ok(fs::try_exists(full_path).await?)
    }
}

/// Blob store kept in memory.
#[derive(Default)]
pub struct MemoryBackend {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        validate_blob_path(path)?;
        self.blobs
            .write()
            .await
            .insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Blob {}", path)))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.blobs.write().await.remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.blobs.read().await.contains_key(path))
    }
}

/// Keep only the final path segment and characters safe in a blob path.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Path for an uploaded image: `images/{uuid}-{filename}`.
pub fn generate_image_path(filename: &str) -> String {
    format!("{}/{}-{}", IMAGE_PREFIX, Uuid::new_v4(), sanitize_filename(filename))
}

/// Public URL under which `path` is served.
pub fn blob_url(public_base: &str, path: &str) -> String {
    format!("{}{}{}", public_base.trim_end_matches('/'), BLOB_ROUTE, path)
}

/// Inverse of [`blob_url`]. Also accepts a bare route-relative URL.
pub fn blob_path_from_url<'a>(public_base: &str, url: &'a str) -> Option<&'a str> {
    let base = public_base.trim_end_matches('/');
    let rest = url.strip_prefix(base).unwrap_or(url);
    rest.strip_prefix(BLOB_ROUTE).filter(|p| !p.is_empty())
}

/// Sniff a content type from the leading bytes.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    infer::get(data)
        .map(|kind| kind.mime_type())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

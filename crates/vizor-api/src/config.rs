//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `8080` |
//! | `DATABASE_URL` | unset: records are kept in memory |
//! | `STORAGE_PATH` | `./data/blobs` |
//! | `PUBLIC_BASE_URL` | `http://localhost:{PORT}` |
//! | `MAX_UPLOAD_BYTES` | 50 MB |
//! | `ALLOWED_ORIGINS` | unset: any origin |

use std::env;

use vizor_core::defaults;
use vizor_inference::ConfigError;

pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_STORAGE_PATH: &str = "STORAGE_PATH";
pub const ENV_PUBLIC_BASE_URL: &str = "PUBLIC_BASE_URL";
pub const ENV_MAX_UPLOAD_BYTES: &str = "MAX_UPLOAD_BYTES";
pub const ENV_ALLOWED_ORIGINS: &str = "ALLOWED_ORIGINS";

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub storage_path: String,
    /// Prefix of the image URLs handed to clients and stored in records.
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    /// CORS allowlist. Empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: defaults::SERVER_PORT,
            database_url: None,
            storage_path: defaults::STORAGE_PATH.to_string(),
            public_base_url: format!("http://localhost:{}", defaults::SERVER_PORT),
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let port = match get(ENV_PORT) {
            Some(v) => v.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: ENV_PORT.to_string(),
                value: v,
            })?,
            None => defaults.port,
        };
        let max_upload_bytes = match get(ENV_MAX_UPLOAD_BYTES) {
            Some(v) => v.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                key: ENV_MAX_UPLOAD_BYTES.to_string(),
                value: v,
            })?,
            None => defaults.max_upload_bytes,
        };

        Ok(Self {
            host: get(ENV_HOST).unwrap_or(defaults.host),
            port,
            database_url: get(ENV_DATABASE_URL),
            storage_path: get(ENV_STORAGE_PATH).unwrap_or(defaults.storage_path),
            public_base_url: get(ENV_PUBLIC_BASE_URL)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            max_upload_bytes,
            allowed_origins: get(ENV_ALLOWED_ORIGINS)
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

//! Provider configuration.
//!
//! Configuration can be loaded from:
//! - a TOML file named by `VIZOR_CONFIG`, with `${VAR}` substitution
//! - environment variables (the default)
//!
//! # Example
//!
//! ```rust,no_run
//! use vizor_inference::config::ProvidersConfig;
//!
//! let config = ProvidersConfig::load().expect("Failed to load config");
//! assert!(config.validate().is_ok());
//! ```
//!
//! ```toml
//! [gemini]
//! endpoint = "https://generativelanguage.googleapis.com"
//! model = "gemini-2.0-flash-exp"
//! credential = { kind = "api_key", value = "${GEMINI_API_KEY}" }
//!
//! [vertex]
//! project_id = "my-project"
//! endpoint_id = "1234567890"
//! credential = { kind = "bearer_token", value = "${GOOGLE_ACCESS_TOKEN}" }
//! confidence_threshold = 0.4
//! ```

use std::env;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use vizor_core::defaults;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ConfigError> for vizor_core::Error {
    fn from(e: ConfigError) -> Self {
        vizor_core::Error::Config(e.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// How a provider request is authenticated.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Credential {
    #[default]
    None,
    /// Sent as the `key` query parameter.
    ApiKey(String),
    /// Sent as `Authorization: Bearer <token>`.
    BearerToken(String),
}

impl Credential {
    /// Attach this credential to an outgoing request.
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Credential::None => request,
            Credential::ApiKey(key) => request.query(&[("key", key)]),
            Credential::BearerToken(token) => request.bearer_auth(token),
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Credential::None)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::None => write!(f, "None"),
            Credential::ApiKey(_) => write!(f, "ApiKey(***)"),
            Credential::BearerToken(_) => write!(f, "BearerToken(***)"),
        }
    }
}

fn default_confidence_threshold() -> f32 {
    defaults::CONFIDENCE_THRESHOLD
}

fn default_max_results() -> u32 {
    defaults::MAX_RESULTS
}

fn default_timeout_secs() -> u64 {
    defaults::PROVIDER_TIMEOUT_SECS
}

/// Settings shared by every provider client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider API. Empty selects the provider default.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub credential: Credential,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn new(endpoint: impl Into<String>, credential: Credential) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential,
            confidence_threshold: defaults::CONFIDENCE_THRESHOLD,
            max_results: defaults::MAX_RESULTS,
            timeout_secs: defaults::PROVIDER_TIMEOUT_SECS,
        }
    }

    /// Endpoint, or `fallback` when none is configured, without a trailing slash.
    pub fn base_url_or(&self, fallback: &str) -> String {
        let url = if self.endpoint.is_empty() {
            fallback
        } else {
            &self.endpoint
        };
        url.trim_end_matches('/').to_string()
    }

    /// Validate the configuration.
    pub fn validate(&self, name: &str) -> ConfigResult<()> {
        if !self.endpoint.is_empty()
            && !self.endpoint.starts_with("http://")
            && !self.endpoint.starts_with("https://")
        {
            return Err(ConfigError::Validation(format!(
                "{} endpoint must start with http:// or https://, got: {}",
                name, self.endpoint
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::Validation(format!(
                "{} confidence_threshold must be within [0, 1], got: {}",
                name, self.confidence_threshold
            )));
        }
        if self.max_results == 0 {
            return Err(ConfigError::Validation(format!(
                "{} max_results must be at least 1",
                name
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(format!(
                "{} timeout_secs must be at least 1",
                name
            )));
        }
        Ok(())
    }
}

/// Custom-trained Vertex AI endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    pub project_id: String,
    pub endpoint_id: String,
    #[serde(default = "default_vertex_location")]
    pub location: String,
}

fn default_vertex_location() -> String {
    defaults::VERTEX_LOCATION.to_string()
}

impl VertexConfig {
    /// Regional API host unless an endpoint override is configured.
    pub fn base_url(&self) -> String {
        self.provider
            .base_url_or(&format!("https://{}-aiplatform.googleapis.com", self.location))
    }

    /// Full `:predict` URL.
    pub fn predict_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/endpoints/{}:predict",
            self.base_url(),
            self.project_id,
            self.location,
            self.endpoint_id
        )
    }
}

/// Generative multimodal model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

fn default_gemini_model() -> String {
    defaults::GEMINI_MODEL.to_string()
}

/// Video label annotation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    defaults::VIDEO_POLL_INTERVAL_SECS
}

fn default_poll_timeout_secs() -> u64 {
    defaults::VIDEO_POLL_TIMEOUT_SECS
}

/// Configuration for every provider. A `None` section disables that provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub vision: Option<ProviderConfig>,
    #[serde(default)]
    pub vertex: Option<VertexConfig>,
    #[serde(default)]
    pub gemini: Option<GeminiConfig>,
    #[serde(default)]
    pub video: Option<VideoConfig>,
}

impl ProvidersConfig {
    /// Load from the file named by `VIZOR_CONFIG`, falling back to the environment.
    pub fn load() -> ConfigResult<Self> {
        match env::var(defaults::ENV_CONFIG_PATH) {
            Ok(path) if !path.is_empty() => {
                info!("Loading provider config from: {}", path);
                Self::from_file(Path::new(&path))
            }
            _ => {
                debug!("VIZOR_CONFIG not set, using environment variables");
                Self::from_env()
            }
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML content after `${VAR}` substitution.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let content = Self::substitute_env_vars(content);
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from process environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// A provider is enabled only when the variables it needs are present:
    /// vision and video need `VISION_API_KEY` or `GOOGLE_ACCESS_TOKEN`,
    /// vertex needs `VERTEX_PROJECT_ID` and `VERTEX_ENDPOINT_ID`, gemini
    /// needs `GEMINI_API_KEY`.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let confidence_threshold = match get(defaults::ENV_CONFIDENCE_THRESHOLD) {
            Some(v) => v.parse::<f32>().map_err(|_| ConfigError::InvalidValue {
                key: defaults::ENV_CONFIDENCE_THRESHOLD.to_string(),
                value: v,
            })?,
            None => defaults::CONFIDENCE_THRESHOLD,
        };
        let max_results = match get(defaults::ENV_MAX_RESULTS) {
            Some(v) => v.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                key: defaults::ENV_MAX_RESULTS.to_string(),
                value: v,
            })?,
            None => defaults::MAX_RESULTS,
        };
        let timeout_secs = match get(defaults::ENV_PROVIDER_TIMEOUT_SECS) {
            Some(v) => v.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: defaults::ENV_PROVIDER_TIMEOUT_SECS.to_string(),
                value: v,
            })?,
            None => defaults::PROVIDER_TIMEOUT_SECS,
        };

        let shared = |endpoint: Option<String>, credential: Credential| ProviderConfig {
            endpoint: endpoint.unwrap_or_default(),
            credential,
            confidence_threshold,
            max_results,
            timeout_secs,
        };

        let access_token = get(defaults::ENV_GOOGLE_ACCESS_TOKEN);
        let google_credential = get(defaults::ENV_VISION_API_KEY)
            .map(Credential::ApiKey)
            .or_else(|| access_token.clone().map(Credential::BearerToken));

        let vision = google_credential
            .clone()
            .map(|c| shared(get(defaults::ENV_VISION_BASE_URL), c));

        let video = google_credential.map(|c| VideoConfig {
            provider: shared(get(defaults::ENV_VIDEO_BASE_URL), c),
            poll_interval_secs: defaults::VIDEO_POLL_INTERVAL_SECS,
            poll_timeout_secs: defaults::VIDEO_POLL_TIMEOUT_SECS,
        });

        let vertex = match (
            get(defaults::ENV_VERTEX_PROJECT_ID),
            get(defaults::ENV_VERTEX_ENDPOINT_ID),
        ) {
            (Some(project_id), Some(endpoint_id)) => Some(VertexConfig {
                provider: shared(
                    get(defaults::ENV_VERTEX_BASE_URL),
                    access_token
                        .clone()
                        .map(Credential::BearerToken)
                        .unwrap_or_default(),
                ),
                project_id,
                endpoint_id,
                location: get(defaults::ENV_VERTEX_LOCATION)
                    .unwrap_or_else(default_vertex_location),
            }),
            _ => None,
        };

        let gemini = get(defaults::ENV_GEMINI_API_KEY).map(|key| GeminiConfig {
            provider: shared(get(defaults::ENV_GEMINI_BASE_URL), Credential::ApiKey(key)),
            model: get(defaults::ENV_GEMINI_MODEL).unwrap_or_else(default_gemini_model),
        });

        let config = Self {
            vision,
            vertex,
            gemini,
            video,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate every configured section.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(ref vision) = self.vision {
            vision.validate("vision")?;
        }
        if let Some(ref vertex) = self.vertex {
            vertex.provider.validate("vertex")?;
            if vertex.project_id.is_empty() || vertex.endpoint_id.is_empty() {
                return Err(ConfigError::Validation(
                    "vertex project_id and endpoint_id cannot be empty".to_string(),
                ));
            }
        }
        if let Some(ref gemini) = self.gemini {
            gemini.provider.validate("gemini")?;
            if gemini.model.is_empty() {
                return Err(ConfigError::Validation(
                    "gemini model cannot be empty".to_string(),
                ));
            }
        }
        if let Some(ref video) = self.video {
            video.provider.validate("video")?;
            if video.poll_interval_secs == 0 {
                return Err(ConfigError::Validation(
                    "video poll_interval_secs must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Replace `${NAME}` with the value of `NAME`. Unset names are left as written.
    fn substitute_env_vars(content: &str) -> String {
        let Ok(placeholder) = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") else {
            return content.to_string();
        };
        placeholder
            .replace_all(content, |caps: &regex::Captures| {
                env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
            })
            .into_owned()
    }
}

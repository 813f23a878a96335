//! Database connection pool management.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use vizor_core::{Error, Result};

/// Default maximum number of connections in the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default acquire timeout in seconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Idle connections are closed after this many seconds.
const IDLE_TIMEOUT_SECS: u64 = 300;

/// Environment variable overriding [`DEFAULT_MAX_CONNECTIONS`].
pub const ENV_MAX_CONNECTIONS: &str = "DATABASE_MAX_CONNECTIONS";

/// Environment variable overriding [`DEFAULT_ACQUIRE_TIMEOUT_SECS`].
pub const ENV_ACQUIRE_TIMEOUT_SECS: &str = "DATABASE_ACQUIRE_TIMEOUT_SECS";

/// Sizing and timeouts for the record store's pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// How long a request waits for a free connection.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

impl PoolConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by any positive integer found under the pool keys.
    ///
    /// Unparsable or zero values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let positive = |key: &str| -> Option<u64> {
            let raw = lookup(key)?;
            match raw.trim().parse::<u64>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    warn!(
                        subsystem = "database",
                        component = "pool",
                        key,
                        value = %raw,
                        "Ignoring invalid pool setting"
                    );
                    None
                }
            }
        };

        let defaults = Self::default();
        Self {
            max_connections: positive(ENV_MAX_CONNECTIONS)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.max_connections),
            acquire_timeout: positive(ENV_ACQUIRE_TIMEOUT_SECS)
                .map(Duration::from_secs)
                .unwrap_or(defaults.acquire_timeout),
        }
    }
}

/// Create a PostgreSQL connection pool with default sizing.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, &PoolConfig::default()).await
}

pub async fn create_pool_with_config(database_url: &str, config: &PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(Duration::from_secs(IDLE_TIMEOUT_SECS))
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "database",
        component = "pool",
        op = "connect",
        max_connections = config.max_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Database connection pool established"
    );
    Ok(pool)
}

/// Log current pool size and warn when no connection is idle.
pub fn log_pool_metrics(pool: &PgPool) {
    let size = pool.size();
    let idle = pool.num_idle();

    debug!(
        subsystem = "database",
        component = "pool",
        op = "metrics",
        pool_size = size,
        pool_idle = idle,
        "Pool health check"
    );

    if idle == 0 && size > 0 {
        warn!(
            subsystem = "database",
            component = "pool",
            pool_size = size,
            "Connection pool has no idle connections"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_pool_config_defaults() {
        let config = PoolConfig::from_lookup(lookup(&[]));
        assert_eq!(config, PoolConfig::default());
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(
            config.acquire_timeout,
            Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_pool_config_from_lookup() {
        let config = PoolConfig::from_lookup(lookup(&[
            (ENV_MAX_CONNECTIONS, " 20 "),
            (ENV_ACQUIRE_TIMEOUT_SECS, "3"),
        ]));
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.acquire_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_pool_config_ignores_invalid_values() {
        let config = PoolConfig::from_lookup(lookup(&[
            (ENV_MAX_CONNECTIONS, "0"),
            (ENV_ACQUIRE_TIMEOUT_SECS, "soon"),
        ]));
        assert_eq!(config, PoolConfig::default());

        let too_big = (u64::from(u32::MAX) + 1).to_string();
        let config = PoolConfig::from_lookup(lookup(&[(ENV_MAX_CONNECTIONS, too_big.as_str())]));
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }
}

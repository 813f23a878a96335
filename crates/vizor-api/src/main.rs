//! vizor-api - HTTP API server for vizor.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vizor_core::ImageRecordRepository;
use vizor_db::{
    log_pool_metrics, Database, FilesystemBackend, InMemoryImageRecordRepository, PoolConfig,
};
use vizor_inference::{ProviderRegistry, ProvidersConfig};

use vizor_api::{router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "vizor_api=debug,vizor_inference=info,vizor_db=info,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("vizor-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = ServerConfig::from_env()?;
    let providers = ProviderRegistry::from_config(&ProvidersConfig::load()?);
    info!(
        subsystem = "api",
        providers = ?providers.configured(),
        video = providers.video().is_some(),
        "Providers configured"
    );

    let records: Arc<dyn ImageRecordRepository> = match config.database_url.as_deref() {
        Some(url) => {
            let db = Database::connect_with_config(url, &PoolConfig::from_env()).await?;
            db.migrate().await?;
            log_pool_metrics(db.pool());
            info!(subsystem = "api", "Connected to database");
            Arc::new(db.image_records)
        }
        None => {
            warn!(
                subsystem = "api",
                "DATABASE_URL not set, image records are kept in memory and lost on restart"
            );
            Arc::new(InMemoryImageRecordRepository::new())
        }
    };

    let blobs = FilesystemBackend::new(&config.storage_path);
    blobs.validate().await?;
    info!(subsystem = "api", storage_path = %config.storage_path, "Blob storage ready");

    let state = AppState::new(
        providers,
        records,
        Arc::new(blobs),
        config.public_base_url.clone(),
    );
    let app = router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

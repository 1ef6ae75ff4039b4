use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cornstand::config::{CornstandConfig, LogFormat, LoggingConfig};
use cornstand::http::HttpServer;
use cornstand::purchase::PurchaseService;
use cornstand::store::{InMemoryStore, KeyValueStore};

/// Command-line arguments; each flag overrides the matching config value.
#[derive(Parser, Debug)]
#[command(name = "cornstand")]
#[command(about = "Per-client purchase admission service", version)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP listen address
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Purchase window in seconds
    #[arg(long)]
    window_secs: Option<u64>,

    /// Redis connection URL
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = CornstandConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.http_addr {
        config.server.http_addr = addr;
    }
    if let Some(window_secs) = args.window_secs {
        config.limits.window_secs = window_secs;
    }
    if let Some(url) = args.redis_url {
        config.store.redis_url = Some(url);
    }
    config.validate()?;

    init_tracing(&config.logging);

    info!("Starting Cornstand Purchase Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &args.config {
        info!(path = %path.display(), "Loaded configuration file");
    }
    info!(
        http_addr = %config.server.http_addr,
        window_secs = config.limits.window_secs,
        retention_secs = config.limits.retention_secs,
        "Configuration loaded"
    );

    let store = build_store(&config).await?;
    let service = Arc::new(PurchaseService::new(
        store,
        &config.store.namespace,
        config.limits,
    ));
    info!("Purchase service initialized");

    HttpServer::new(config.server.http_addr, service)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    info!("Cornstand Purchase Service stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[cfg(feature = "redis-store")]
async fn build_store(config: &CornstandConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    use cornstand::store::{RedisStore, RedisStoreConfig};

    match &config.store.redis_url {
        Some(url) => {
            let store = RedisStore::connect_with_config(
                url,
                RedisStoreConfig {
                    operation_timeout: config.store.operation_timeout(),
                },
            )
            .await?;
            info!("Using Redis store");
            Ok(Arc::new(store))
        }
        None => Ok(in_memory_store()),
    }
}

#[cfg(not(feature = "redis-store"))]
async fn build_store(config: &CornstandConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    if config.store.redis_url.is_some() {
        anyhow::bail!("store.redis_url is set but this build lacks the `redis-store` feature");
    }
    Ok(in_memory_store())
}

fn in_memory_store() -> Arc<dyn KeyValueStore> {
    warn!("No Redis URL configured, using in-memory store. Do not use in production.");
    Arc::new(InMemoryStore::new())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

//! EcoTrack Ingestion Engine
//!
//! Scheduled background ingestion of environmental data:
//! - Weather (Open-Meteo), air quality (WAQI), energy (data.gouv.fr)
//! - Normalization into indicators with per-provider duplicate suppression
//! - Daily retention and periodic metrics reporting

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tracing::{error, info, warn};
use validator::Validate;

use clickhouse_client::{health as ch_health, ClickHouseClient, ClickHouseConfig, ClickHouseStore};
use engine_core::{MemoryStore, Store, Zone};
use providers::{build_http_client, http_fetcher, ProviderConfig};
use telemetry::{init_tracing, TracingConfig};
use worker::{register_engine_jobs, Scheduler, WorkerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StoreBackend {
    Clickhouse,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreConfig {
    #[serde(default = "default_backend")]
    backend: StoreBackend,
    #[serde(default)]
    clickhouse: ClickHouseConfig,
    /// Zones loaded into the memory backend at startup.
    #[serde(default)]
    zones: Vec<Zone>,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Clickhouse
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            clickhouse: ClickHouseConfig::default(),
            zones: Vec::new(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
struct Config {
    #[serde(flatten)]
    #[validate(nested)]
    worker: WorkerConfig,

    #[serde(default)]
    store: StoreConfig,

    #[serde(default)]
    #[validate(nested)]
    providers: ProviderConfig,

    #[serde(default)]
    logging: TracingConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = load_config()?;
    init_tracing(&config.logging.clone().overlay_env());

    info!("Starting EcoTrack Ingestion Engine v{}", env!("CARGO_PKG_VERSION"));
    info!(
        backend = ?config.store.backend,
        owner_id = config.worker.owner_id,
        "Loaded configuration"
    );

    let store = build_store(&config.store).await?;

    let http = build_http_client(&config.providers).context("Failed to build HTTP client")?;

    let mut scheduler = Scheduler::new();
    register_engine_jobs(&mut scheduler, &config.worker, store, |kind| {
        http_fetcher(kind, http.clone(), &config.providers)
    })
    .context("Failed to register jobs")?;
    scheduler.start().context("Failed to start scheduler")?;

    shutdown_signal().await;

    info!("Shutting down...");
    let report = scheduler.stop(config.worker.shutdown_timeout()).await;
    if !report.is_clean() {
        warn!(abandoned = ?report.abandoned, "Some jobs were abandoned at shutdown");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from defaults, `config/default.toml`, and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables, e.g. ECOTRACK__STORE__BACKEND=memory
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("ECOTRACK")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn build_store(config: &StoreConfig) -> Result<Arc<dyn Store>> {
    match config.backend {
        StoreBackend::Memory => {
            info!(zones = config.zones.len(), "Using in-memory store");
            Ok(Arc::new(MemoryStore::with_zones(config.zones.clone())))
        }
        StoreBackend::Clickhouse => {
            let client = ClickHouseClient::new(config.clickhouse.clone());

            if ch_health::check_connection(&client).await {
                info!("ClickHouse connection: healthy");
            } else {
                error!("ClickHouse connection: unhealthy");
            }

            if config.clickhouse.init_schema {
                if let Err(e) = ch_health::init_schema(&client).await {
                    error!("Failed to initialize ClickHouse schema: {}", e);
                    // Continue anyway - schema might already exist
                }
            }

            Ok(Arc::new(ClickHouseStore::new(client)))
        }
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}

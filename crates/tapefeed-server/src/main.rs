//! Dashboard server binary for the tapefeed event pipeline.
//!
//! Wires together the resilient Redis connection, the keyed event store,
//! the distribution service, and the Axum HTTP/WebSocket surface.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `tapefeed.yaml`
//! 3. Connect to Redis with bounded retry (failure here aborts startup)
//! 4. Assemble the keyed event store and event bus
//! 5. Start the distribution service
//! 6. Serve HTTP/WebSocket traffic until shutdown
//! 7. Stop the distribution service

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tapefeed_distributor::{ClientRegistry, DistributionService, DistributorConfig};
use tapefeed_server::{AppConfig, AppState, build_router};
use tapefeed_store::{KeyedEventStore, RedisBackend, RedisBus};

/// Default configuration file path, overridable with `TAPEFEED_CONFIG`.
const CONFIG_PATH: &str = "tapefeed.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any startup step fails -- most importantly when the
/// backing store is unreachable after every connection attempt, in which
/// case the process must not serve traffic.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("tapefeed-server starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        redis_url = %config.redis.url,
        prefix = %config.redis.prefix,
        "Configuration loaded"
    );

    // 3. Connect to Redis. Exhausting every attempt is fatal.
    let opts = config.redis.connect_options();
    let backend = RedisBackend::connect(&config.redis.url, &opts).await?;
    let bus = RedisBus::new(backend.client().clone(), config.redis.url.clone(), opts);
    info!("Redis connection established");

    // 4. Assemble the store and shared state.
    let store = KeyedEventStore::new(
        Arc::new(backend),
        Arc::new(bus.clone()),
        config.redis.prefix.clone(),
    );
    let registry = Arc::new(ClientRegistry::new());
    let state = Arc::new(AppState::new(store.clone(), Arc::clone(&registry)));

    // 5. Start the distribution service.
    let distributor = DistributionService::new(
        store,
        Arc::new(bus),
        registry,
        DistributorConfig {
            poll_interval: Duration::from_millis(config.distributor.poll_interval_ms),
            error_pause: Duration::from_millis(config.distributor.error_pause_ms),
        },
    );
    let distributor_handle = distributor.spawn().await?;

    // 6. Serve until shutdown.
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "tapefeed server listening");

    let router = build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 7. Stop the distribution service before exiting.
    distributor_handle.stop().await;
    info!("tapefeed-server stopped");
    Ok(())
}

/// Resolve when the process receives a shutdown signal.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        return;
    }
    info!("shutdown signal received");
}

/// Load configuration from `TAPEFEED_CONFIG` or the default path, falling
/// back to defaults when no file exists.
fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    let path = std::env::var("TAPEFEED_CONFIG").unwrap_or_else(|_| CONFIG_PATH.to_owned());
    let path = Path::new(&path);
    if path.exists() {
        Ok(AppConfig::from_file(path)?)
    } else {
        info!(path = %path.display(), "no config file found, using defaults");
        Ok(AppConfig::default())
    }
}

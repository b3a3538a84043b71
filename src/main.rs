// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::application::device_registry::DeviceRegistry;
use crate::application::metric_cache::MetricCache;
use crate::application::range_service::RangeService;
use crate::application::snapshot_service::SnapshotService;
use crate::application::streaming_service::StreamingService;
use crate::application::tank_settings::TankSettingsService;
use crate::application::timeseries_repository::TimeSeriesRepository;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::victoria_repository::VictoriaRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create repository (infrastructure layer)
    let repository: Arc<dyn TimeSeriesRepository> = Arc::new(VictoriaRepository::new(
        config.store.base_url.clone(),
        config.store.timeouts(),
    )?);

    // Create services (application layer)
    let cache = Arc::new(MetricCache::new());
    let device_registry = DeviceRegistry::new(
        repository.clone(),
        config.devices.anchor_metric.clone(),
        config.devices.fallback_id.clone(),
    );
    let tank_settings = TankSettingsService::new(config.tank.calibration());
    let snapshot_service = SnapshotService::new(
        repository.clone(),
        cache,
        device_registry.clone(),
        tank_settings.clone(),
        config.metrics.tracked.clone(),
        config.metrics.empty_result_policy,
    );
    let range_service = RangeService::new(repository, config.metrics.tracked.clone());
    let streaming_service =
        StreamingService::new(Arc::new(snapshot_service.clone()), config.stream.settings());

    // Create application state
    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState {
        snapshot_service,
        range_service,
        device_registry,
        tank_settings,
        streaming_service,
        shutdown: shutdown.clone(),
    });

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!(
        "Starting tank-telemetry-gateway on {} (store {})",
        addr,
        config.store.base_url
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    Ok(())
}

/// Resolves on Ctrl-C and closes every open stream session so the server
/// can drain.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
    shutdown.cancel();
}

//! Service entry point for the Atlas spatial query service.
//!
//! Wires the components together and runs until shutdown:
//!
//! ```text
//! POST /data --> engine commits change --> NOTIFY car_changes
//!      --> ChangeListener --> mpsc --> RecomputeWorker --> DerivedCache
//!      --> GET /clusterResult, /realSource serve the refreshed value
//! ```
//!
//! The HTTP server, the listener task, and the recompute worker run
//! concurrently on the Tokio runtime. A failure of the notification
//! subsystem is logged as fatal for that subsystem only; request serving
//! continues on the shared pool.

mod config;
mod error;

use std::sync::Arc;

use atlas_api::recompute::RecomputeWorker;
use atlas_api::server::{ServerConfig, start_server};
use atlas_api::state::AppState;
use atlas_db::engine::SpatialEngine;
use atlas_db::{ChangeListener, PostgresConfig, PostgresPool};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ServiceConfig;

/// Application entry point.
///
/// Initializes logging, loads configuration from environment variables,
/// connects the engine pool, starts the change listener and recompute
/// worker, then serves HTTP until `Ctrl-C`. Any startup failure exits
/// nonzero.
///
/// # Errors
///
/// Returns an error if configuration, the engine connection, or the HTTP
/// server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("atlas-server starting");

    // Load configuration from environment
    let config = ServiceConfig::from_env()?;
    info!(
        host = config.host,
        port = config.port,
        channel = config.channel,
        watched_entity = %config.watched_entity,
        "configuration loaded"
    );

    // Shared query pool for all on-demand endpoints
    let pg_config =
        PostgresConfig::new(&config.database_url).with_max_connections(config.max_connections);
    let pool = PostgresPool::connect(&pg_config).await?;

    let engine: Arc<dyn SpatialEngine> = Arc::new(pool.clone());
    let state = Arc::new(AppState::new(engine, config.watched_entity));

    // Change listener on its own dedicated connection, feeding the
    // recompute worker over an in-process channel.
    let (tx, rx) = ChangeListener::event_channel();
    let listener = ChangeListener::new(&config.database_url, &config.channel);
    let listener_handle = tokio::spawn(async move {
        if let Err(e) = listener.run(tx).await {
            tracing::error!(error = %e, "notification subsystem failed");
        }
    });

    let worker = RecomputeWorker::new(
        Arc::clone(&state.engine),
        Arc::clone(&state.cache),
        config.watched_entity,
    );
    let worker_handle = tokio::spawn(worker.run(rx));

    // Serve until Ctrl-C; in-flight requests drain on the way out.
    let server_config = ServerConfig {
        host: config.host.clone(),
        port: config.port,
    };
    start_server(&server_config, Arc::clone(&state)).await?;

    // Shutdown: stopping the listener drops the event sender, which lets
    // the recompute worker drain and stop on its own.
    info!("shutting down");
    listener_handle.abort();
    let _ = worker_handle.await;
    pool.close().await;

    info!("atlas-server stopped");
    Ok(())
}

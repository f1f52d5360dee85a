//! Stock predictor server
//!
//! Fits the scaler on the historical dataset, loads the model artifact and
//! serves predictions over HTTP.

use anyhow::Result;
use predictor_lib::{HealthRegistry, ServiceMetrics, StructuredLogger};
use predictor_server::{startup, ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting predictor-server");

    let config = ServerConfig::load()?;

    let logger = StructuredLogger::new("predictor-server");
    logger.log_startup(
        SERVER_VERSION,
        &config.model_path.display().to_string(),
        &config.data_path.display().to_string(),
    );

    let health_registry = HealthRegistry::new();
    let metrics = ServiceMetrics::new();

    let state = startup::initialize(&config, health_registry, metrics, logger.clone()).await;
    if !state.predictor.is_ready() {
        warn!("Serving in degraded mode, predictions will be rejected");
    }

    let shutdown_logger = logger.clone();
    let shutdown = async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => shutdown_logger.log_shutdown("SIGINT received"),
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGINT");
                std::future::pending::<()>().await
            }
        }
    };

    predictor_server::serve(&config.bind_addr(), Arc::new(state), shutdown).await?;
    info!("Shutting down");

    Ok(())
}

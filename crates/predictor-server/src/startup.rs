//! Startup phase: load the dataset, fit the scaler and load the model
//!
//! Failures here never abort the process. The failing artifact is recorded
//! as unhealthy and the service runs degraded, rejecting every prediction.

use crate::api::AppState;
use crate::config::ServerConfig;
use predictor_lib::{
    dataset::Dataset,
    health::{components, HealthRegistry},
    predictor::{load_model, LoadedModel},
    FeatureSchema, Predictor, Regressor, ServiceMetrics, StandardScaler, StructuredLogger,
};
use std::sync::Arc;

fn fit_scaler(config: &ServerConfig) -> anyhow::Result<StandardScaler> {
    let dataset = Dataset::load(&config.data_path)?;
    Ok(dataset.fit_scaler()?)
}

/// Build the shared application state from the configured artifacts
pub async fn initialize(
    config: &ServerConfig,
    health_registry: HealthRegistry,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
) -> AppState {
    health_registry.register(components::SCALER).await;
    health_registry.register(components::MODEL).await;

    let scaler = match fit_scaler(config) {
        Ok(scaler) => {
            health_registry.set_healthy(components::SCALER).await;
            logger.log_artifact_loaded(
                components::SCALER,
                &format!(
                    "fit on {} rows, columns {:?}",
                    scaler.n_samples_seen(),
                    scaler.schema().columns()
                ),
            );
            Some(scaler)
        }
        Err(e) => {
            let message = format!("{:#}", e);
            logger.log_artifact_failed(components::SCALER, &message);
            health_registry
                .set_unhealthy(components::SCALER, message)
                .await;
            None
        }
    };
    metrics.set_artifact_loaded(components::SCALER, scaler.is_some());

    // Without a scaler, assume the standard layout for the model input width
    let n_features = scaler
        .as_ref()
        .map(|s| s.schema().input_len())
        .unwrap_or_else(|| FeatureSchema::standard().input_len());

    let mut model_checksum = None;
    let model: Option<Box<dyn Regressor>> =
        match load_model(&config.model_path, n_features, config.model_sha256.as_deref()) {
            Ok(LoadedModel {
                regressor,
                checksum,
                ..
            }) => {
                let schema_check = match (regressor.n_features(), scaler.as_ref()) {
                    (Some(width), Some(scaler)) => scaler.schema().check_input_width(width),
                    _ => Ok(()),
                };
                match schema_check {
                    Ok(()) => {
                        health_registry.set_healthy(components::MODEL).await;
                        let description = regressor.describe();
                        logger.log_artifact_loaded(
                            components::MODEL,
                            &format!("{} ({})", description.model_type, checksum),
                        );
                        metrics.set_model_info(&description.model_type, &checksum);
                        model_checksum = Some(checksum);
                        Some(regressor)
                    }
                    Err(e) => {
                        let message = format!("Model does not match scaler columns: {}", e);
                        logger.log_artifact_failed(components::MODEL, &message);
                        health_registry
                            .set_unhealthy(components::MODEL, message)
                            .await;
                        None
                    }
                }
            }
            Err(e) => {
                let message = format!("{:#}", e);
                logger.log_artifact_failed(components::MODEL, &message);
                health_registry
                    .set_unhealthy(components::MODEL, message)
                    .await;
                None
            }
        };
    metrics.set_artifact_loaded(components::MODEL, model.is_some());

    // Width was checked above, so assembly cannot fail on the schema
    let predictor = Predictor::new(model, scaler).unwrap_or_else(|_| Predictor::uninitialized());

    AppState {
        predictor: Arc::new(predictor),
        health_registry,
        metrics,
        logger,
        model_checksum,
        index_path: config.index_path.clone(),
    }
}

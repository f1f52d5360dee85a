//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, prediction and error counts, artifact state)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge_vec, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounter,
    prediction_errors: IntCounterVec,
    artifact_loaded: IntGaugeVec,
    model_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "stock_predictor_prediction_latency_seconds",
                "Time spent preprocessing and running the model for one request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter!(
                "stock_predictor_predictions_total",
                "Total number of successful predictions"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors: register_int_counter_vec!(
                "stock_predictor_prediction_errors_total",
                "Total number of rejected prediction requests by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            artifact_loaded: register_int_gauge_vec!(
                "stock_predictor_artifact_loaded",
                "Whether a startup artifact loaded (1) or failed (0)",
                &["artifact"]
            )
            .expect("Failed to register artifact_loaded"),

            model_info: register_gauge_vec!(
                "stock_predictor_model_info",
                "Information about the currently loaded model",
                &["model_type", "checksum"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    /// Record the latency of one successful prediction
    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    /// Count a rejected request under its error kind
    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner()
            .prediction_errors
            .with_label_values(&[kind])
            .inc();
    }

    pub fn set_artifact_loaded(&self, artifact: &str, loaded: bool) {
        self.inner()
            .artifact_loaded
            .with_label_values(&[artifact])
            .set(i64::from(loaded));
    }

    pub fn set_model_info(&self, model_type: &str, checksum: &str) {
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[model_type, checksum])
            .set(1.0);
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, model_path: &str, data_path: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            model_path = %model_path,
            data_path = %data_path,
            "Prediction service starting"
        );
    }

    /// Log a successfully loaded artifact
    pub fn log_artifact_loaded(&self, artifact: &str, detail: &str) {
        info!(
            event = "artifact_loaded",
            service = %self.service,
            artifact = %artifact,
            detail = %detail,
            "Startup artifact loaded"
        );
    }

    /// Log an artifact that failed to load; the service stays up but degraded
    pub fn log_artifact_failed(&self, artifact: &str, error: &str) {
        error!(
            event = "artifact_failed",
            service = %self.service,
            artifact = %artifact,
            error = %error,
            "Startup artifact failed to load, predictions will be rejected"
        );
    }

    /// Log a served prediction
    pub fn log_prediction(&self, year: i64, scaled: f64, latency_us: u128) {
        info!(
            event = "prediction_served",
            service = %self.service,
            predicted_year = year,
            scaled_prediction = scaled,
            latency_us = latency_us as u64,
            "Prediction served"
        );
    }

    /// Log a rejected prediction request
    pub fn log_rejected(&self, kind: &str, message: &str) {
        match kind {
            "validation" => info!(
                event = "prediction_rejected",
                service = %self.service,
                kind = %kind,
                message = %message,
                "Prediction request rejected"
            ),
            _ => warn!(
                event = "prediction_failed",
                service = %self.service,
                kind = %kind,
                message = %message,
                "Prediction request failed"
            ),
        }
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Prediction service shutting down"
        );
    }
}

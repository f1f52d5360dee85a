//! HTTP API: prediction, health, model info and Prometheus metrics

use crate::error::ApiError;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use predictor_lib::{
    health::HealthRegistry, predictor::MODEL_CONFIDENCE, PredictError, Prediction, Predictor,
    ServiceMetrics, StructuredLogger,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    pub model_checksum: Option<String>,
    pub index_path: PathBuf,
}

#[derive(Debug, Serialize)]
struct HealthyBody {
    status: &'static str,
    model_loaded: bool,
    scaler_initialized: bool,
    features: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ModelInfoBody {
    model_type: String,
    parameters: Value,
    n_features: Option<usize>,
    n_estimators: Option<usize>,
    features: Option<Vec<String>>,
    artifact_sha256: Option<String>,
}

#[derive(Debug, Serialize)]
struct PredictBody {
    prediction: i64,
    scaled_prediction: f64,
    input_features: Value,
    model_confidence: &'static str,
}

fn input_columns(predictor: &Predictor) -> Option<Vec<String>> {
    predictor.schema().map(|s| s.input_columns())
}

/// Static HTML page if present, otherwise a JSON description of the API
async fn home(State(state): State<Arc<AppState>>) -> Response {
    match tokio::fs::read_to_string(&state.index_path).await {
        Ok(page) => Html(page).into_response(),
        Err(_) => Json(api_description()).into_response(),
    }
}

fn api_description() -> Value {
    json!({
        "message": "Stock Market Prediction API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/predict": "POST - Make predictions",
            "/health": "GET - Health check",
            "/model-info": "GET - Model information",
            "/metrics": "GET - Prometheus metrics"
        },
        "expected_input": {
            "MSFT": "Microsoft stock price (float)",
            "IBM": "IBM stock price (float)",
            "SBUX": "Starbucks stock price (float)",
            "AAPL": "Apple stock price (float)",
            "GSPC": "S&P 500 index (float)",
            "date": "Date in YYYY-MM-DD format (string)"
        }
    })
}

/// Health check - 200 when both artifacts loaded, 500 otherwise
async fn health(State(state): State<Arc<AppState>>) -> Response {
    let predictor = &state.predictor;

    if !predictor.is_ready() {
        let report = state.health_registry.health().await;
        let body = json!({
            "status": "unhealthy",
            "message": "Model or scaler not loaded",
            "components": report.components,
        });
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
    }

    Json(HealthyBody {
        status: "healthy",
        model_loaded: predictor.model().is_some(),
        scaler_initialized: predictor.scaler().is_some(),
        features: input_columns(predictor),
    })
    .into_response()
}

async fn model_info(State(state): State<Arc<AppState>>) -> Response {
    let Some(model) = state.predictor.model() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Model not loaded" })),
        )
            .into_response();
    };

    let description = model.describe();
    Json(ModelInfoBody {
        model_type: description.model_type,
        parameters: description.parameters,
        n_features: description.n_features,
        n_estimators: description.n_estimators,
        features: input_columns(&state.predictor),
        artifact_sha256: state.model_checksum.clone(),
    })
    .into_response()
}

/// Parse the request body into a non-empty JSON object
fn parse_input(body: &[u8]) -> Result<(Value, Map<String, Value>), PredictError> {
    let no_input = || PredictError::validation("No input data provided");

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(no_input());
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| PredictError::validation(format!("Invalid JSON body: {}", e)))?;

    match value.as_object() {
        Some(map) if !map.is_empty() => {
            let map = map.clone();
            Ok((value, map))
        }
        _ => Err(no_input()),
    }
}

fn run_prediction(state: &AppState, body: &[u8]) -> Result<(Prediction, Value), PredictError> {
    if !state.predictor.is_ready() {
        return Err(PredictError::NotInitialized(
            "Model or scaler not initialized".to_string(),
        ));
    }
    let (echo, input) = parse_input(body)?;
    let prediction = state.predictor.predict_raw(&input)?;
    Ok((prediction, echo))
}

async fn predict(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let start = Instant::now();

    match run_prediction(&state, &body) {
        Ok((prediction, echo)) => {
            let elapsed = start.elapsed();
            state.metrics.observe_prediction_latency(elapsed.as_secs_f64());
            state.metrics.inc_predictions();
            state
                .logger
                .log_prediction(prediction.year, prediction.scaled, elapsed.as_micros());

            Json(PredictBody {
                prediction: prediction.year,
                scaled_prediction: prediction.scaled,
                input_features: echo,
                model_confidence: MODEL_CONFIDENCE,
            })
            .into_response()
        }
        Err(err) => {
            state.metrics.inc_prediction_errors(err.kind());
            state.logger.log_rejected(err.kind(), &err.to_string());
            ApiError(err).into_response()
        }
    }
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/model-info", get(model_info))
        .route("/predict", post(predict))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server, stopping when `shutdown` resolves
pub async fn serve<F>(addr: &str, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

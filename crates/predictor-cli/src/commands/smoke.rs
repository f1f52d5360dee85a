//! End-to-end smoke test against a running service

use anyhow::{bail, Context, Result};
use colored::Colorize;
use predictor_lib::dataset::Dataset;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::json;
use std::path::Path;

use crate::client::{ApiClient, HealthStatus, ModelInfo, PredictRequest, PredictResponse};
use crate::output::{print_error, print_info, print_json, print_success, OutputFormat};

/// Outcome of a single check
#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    fn from_outcome(name: &'static str, outcome: Result<String>) -> Self {
        match outcome {
            Ok(detail) => Self {
                name,
                passed: true,
                detail,
            },
            Err(e) => Self {
                name,
                passed: false,
                detail: format!("{:#}", e),
            },
        }
    }
}

async fn check_health(client: &ApiClient) -> Result<String> {
    let response = client.get_raw("health").await?;
    if response.status != StatusCode::OK {
        bail!("status {}", response.status);
    }
    let health: HealthStatus = response.json()?;
    Ok(format!("status: {}", health.status))
}

async fn check_home(client: &ApiClient) -> Result<String> {
    let response = client.get_raw("").await?;
    if response.status != StatusCode::OK {
        bail!("status {}", response.status);
    }
    Ok(format!("{} bytes", response.body.len()))
}

async fn check_model_info(client: &ApiClient) -> Result<String> {
    let info: ModelInfo = client.get("model-info").await?;
    let n_features = info
        .n_features
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    Ok(format!("{} with {} features", info.model_type, n_features))
}

async fn check_prediction(client: &ApiClient, data: &Path) -> Result<String> {
    let dataset = Dataset::load(data)?;
    let sample = dataset
        .records()
        .first()
        .with_context(|| format!("No usable rows in {}", data.display()))?;

    let request = PredictRequest {
        prices: sample.prices,
        date: Some(sample.date.format("%Y-%m-%d").to_string()),
    };
    let result: PredictResponse = client.post("predict", &request).await?;
    Ok(format!(
        "sample from {} predicted {} (scaled {:.4})",
        sample.date, result.prediction, result.scaled_prediction
    ))
}

async fn check_rejects_incomplete(client: &ApiClient) -> Result<String> {
    let response = client.post_raw("predict", &json!({"MSFT": 100.0})).await?;
    if response.status != StatusCode::BAD_REQUEST {
        bail!("expected 400, got {}", response.status);
    }
    Ok("incomplete input rejected".to_string())
}

/// Run every check in order, never stopping early
pub async fn run_checks(client: &ApiClient, data: &Path) -> Vec<CheckResult> {
    vec![
        CheckResult::from_outcome("Health check", check_health(client).await),
        CheckResult::from_outcome("Home endpoint", check_home(client).await),
        CheckResult::from_outcome("Model info", check_model_info(client).await),
        CheckResult::from_outcome("Prediction", check_prediction(client, data).await),
        CheckResult::from_outcome("Error handling", check_rejects_incomplete(client).await),
    ]
}

/// Run the smoke test and fail if any check failed
pub async fn run(client: &ApiClient, data: &Path, format: OutputFormat) -> Result<()> {
    if matches!(format, OutputFormat::Table) {
        println!("{}", "Testing Stock Market Prediction API".bold());
        println!("{}", "=".repeat(40));
    }

    let results = run_checks(client, data).await;

    match format {
        OutputFormat::Json => print_json(&results)?,
        OutputFormat::Table => {
            for (i, result) in results.iter().enumerate() {
                let line = format!("{}. {}: {}", i + 1, result.name, result.detail);
                if result.passed {
                    print_success(&line);
                } else {
                    print_error(&line);
                }
            }
            println!("{}", "=".repeat(40));
        }
    }

    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        bail!("{} of {} checks failed", failed, results.len());
    }
    if matches!(format, OutputFormat::Table) {
        print_info("All checks passed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Date,MSFT,IBM,SBUX,AAPL,GSPC").unwrap();
        writeln!(file, "2015-01-02,46.76,162.06,40.72,109.33,2058.2").unwrap();
        writeln!(file, "2015-01-05,46.32,159.51,39.94,106.25,2020.58").unwrap();
        file
    }

    async fn healthy_server() -> mockito::ServerGuard {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_body(r#"{"status":"healthy","model_loaded":true,"scaler_initialized":true}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/")
            .with_body("<html></html>")
            .create_async()
            .await;
        server
            .mock("GET", "/model-info")
            .with_body(r#"{"model_type":"RandomForestRegressor","n_features":7}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/predict")
            .match_body(mockito::Matcher::PartialJson(
                json!({"MSFT": 46.76, "date": "2015-01-02"}),
            ))
            .with_body(
                json!({
                    "prediction": 2015,
                    "scaled_prediction": -1.2,
                    "input_features": {},
                    "model_confidence": "High"
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", "/predict")
            .match_body(mockito::Matcher::Json(json!({"MSFT": 100.0})))
            .with_status(400)
            .with_body(r#"{"error":"Missing required feature: IBM"}"#)
            .create_async()
            .await;
        server
    }

    #[tokio::test]
    async fn test_all_checks_pass() {
        let server = healthy_server().await;
        let csv = write_csv();
        let client = ApiClient::new(&server.url()).unwrap();

        let results = run_checks(&client, csv.path()).await;

        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.passed), "{:?}", results);
        assert!(results[3].detail.contains("2015"));
    }

    #[tokio::test]
    async fn test_unhealthy_service_fails_checks() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(500)
            .with_body(r#"{"status":"unhealthy","error":"Model not loaded"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/predict")
            .with_status(500)
            .with_body(r#"{"error":"Model or scaler not initialized"}"#)
            .create_async()
            .await;
        let csv = write_csv();
        let client = ApiClient::new(&server.url()).unwrap();

        let results = run_checks(&client, csv.path()).await;

        assert!(results.iter().all(|r| !r.passed), "{:?}", results);
        assert!(run(&client, csv.path(), OutputFormat::Json).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_dataset_fails_only_prediction() {
        let server = healthy_server().await;
        let client = ApiClient::new(&server.url()).unwrap();

        let results = run_checks(&client, Path::new("/nonexistent/stockdata.csv")).await;

        let failed: Vec<_> = results.iter().filter(|r| !r.passed).map(|r| r.name).collect();
        assert_eq!(failed, vec!["Prediction"]);
    }
}

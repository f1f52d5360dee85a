//! Service status and prediction commands

use anyhow::{Context, Result};
use colored::Colorize;
use predictor_lib::StockPrices;

use crate::client::{ApiClient, HealthStatus, ModelInfo, PredictRequest, PredictResponse};
use crate::output::{
    color_status, or_dash, print_fields, print_json, print_success, print_warning, FieldRow,
    OutputFormat,
};

/// Show service health. An unhealthy service is reported, not treated as an error.
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response = client.get_raw("health").await?;
    let health: HealthStatus = response
        .json()
        .with_context(|| format!("Unexpected health response ({})", response.status))?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("{}", "Service Health".bold());
            println!("{}", "=".repeat(40));
            println!("Endpoint: {}", client.base_url().as_str().cyan());
            println!("Status:   {}", color_status(&health.status));
            println!();

            let mut rows = vec![
                FieldRow::new("Model loaded", or_dash(health.model_loaded)),
                FieldRow::new("Scaler initialized", or_dash(health.scaler_initialized)),
            ];
            if let Some(features) = &health.features {
                rows.push(FieldRow::new("Features", features.join(", ")));
            }
            print_fields(rows);

            if let Some(message) = &health.message {
                print_warning(message);
            }
        }
    }

    Ok(())
}

/// Show the loaded model description
pub async fn show_model_info(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let info: ModelInfo = client.get("model-info").await?;

    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Table => {
            println!("{}", "Model Information".bold());
            println!("{}", "=".repeat(40));

            let mut rows = vec![
                FieldRow::new("Model type", &info.model_type),
                FieldRow::new("Features", or_dash(info.n_features)),
                FieldRow::new("Estimators", or_dash(info.n_estimators)),
                FieldRow::new("SHA256", or_dash(info.artifact_sha256.as_deref())),
            ];
            if let Some(columns) = &info.features {
                rows.push(FieldRow::new("Columns", columns.join(", ")));
            }
            if let Some(params) = info.parameters.as_object() {
                for (name, value) in params {
                    rows.push(FieldRow::new(&format!("  {}", name), value));
                }
            }
            print_fields(rows);
        }
    }

    Ok(())
}

/// Request a prediction for one set of prices
pub async fn predict(
    client: &ApiClient,
    prices: StockPrices,
    date: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let request = PredictRequest { prices, date };
    let result: PredictResponse = client.post("predict", &request).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Predicted year: {}",
                result.prediction.to_string().green().bold()
            ));
            print_fields(vec![
                FieldRow::new("Scaled prediction", format!("{:.4}", result.scaled_prediction)),
                FieldRow::new("Model confidence", &result.model_confidence),
            ]);
        }
    }

    Ok(())
}

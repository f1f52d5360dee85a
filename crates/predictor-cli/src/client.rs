//! API client for the stock predictor service

use anyhow::{Context, Result};
use predictor_lib::StockPrices;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// API client for the prediction service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

/// Status and raw body of a response, whatever its status code
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).context("Failed to parse response")
    }
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.get_raw(path).await?;
        if !response.status.is_success() {
            anyhow::bail!("API error ({}): {}", response.status, response.body);
        }
        response.json()
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.post_raw(path, body).await?;
        if !response.status.is_success() {
            let detail = response
                .json::<ErrorResponse>()
                .map(|e| e.error)
                .unwrap_or(response.body);
            anyhow::bail!("API error ({}): {}", response.status, detail);
        }
        response.json()
    }

    /// GET without treating error statuses as failures
    pub async fn get_raw(&self, path: &str) -> Result<RawResponse> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::read(response).await
    }

    /// POST without treating error statuses as failures
    pub async fn post_raw<B: Serialize>(&self, path: &str, body: &B) -> Result<RawResponse> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::read(response).await
    }

    async fn read(response: reqwest::Response) -> Result<RawResponse> {
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;
        Ok(RawResponse { status, body })
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_loaded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler_initialized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    #[serde(default)]
    pub parameters: Value,
    pub n_features: Option<usize>,
    #[serde(default)]
    pub n_estimators: Option<usize>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub artifact_sha256: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    #[serde(flatten)]
    pub prices: StockPrices,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: i64,
    pub scaled_prediction: f64,
    pub input_features: Value,
    pub model_confidence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prices() -> StockPrices {
        StockPrices {
            msft: 60.5,
            ibm: 125.0,
            sbux: 58.0,
            aapl: 110.0,
            gspc: 5042.0,
        }
    }

    #[test]
    fn test_predict_request_uses_ticker_keys() {
        let request = PredictRequest {
            prices: prices(),
            date: Some("2021-06-15".to_string()),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["GSPC"], 5042.0);
        assert_eq!(value["date"], "2021-06-15");

        let request = PredictRequest {
            prices: prices(),
            date: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("date").is_none());
    }

    #[tokio::test]
    async fn test_predict_roundtrip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_body(mockito::Matcher::PartialJson(json!({"MSFT": 60.5})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "prediction": 2021,
                    "scaled_prediction": 0.95,
                    "input_features": {"MSFT": 60.5},
                    "model_confidence": "High (R² > 0.99 on test data)"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let request = PredictRequest {
            prices: prices(),
            date: None,
        };
        let response: PredictResponse = client.post("predict", &request).await.unwrap();

        assert_eq!(response.prediction, 2021);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_surfaces_error_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(400)
            .with_body(r#"{"error":"Missing required feature: IBM"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .post::<PredictResponse, _>("predict", &json!({"MSFT": 100.0}))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("Missing required feature: IBM"));
    }

    #[tokio::test]
    async fn test_raw_keeps_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(500)
            .with_body(r#"{"status":"unhealthy","message":"Model or scaler not loaded"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client.get_raw("health").await.unwrap();
        let health: HealthStatus = response.json().unwrap();

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(health.status, "unhealthy");
        assert_eq!(health.message.as_deref(), Some("Model or scaler not loaded"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}

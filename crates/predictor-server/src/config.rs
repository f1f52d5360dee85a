//! Server configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration, read from `PREDICTOR_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Serialized model artifact (`.onnx` or `.json`)
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Historical CSV the scaler is refit on
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Optional HTML page served on `/`
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Expected SHA256 of the model artifact, hex encoded
    #[serde(default)]
    pub model_sha256: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_model_path() -> PathBuf {
    PathBuf::from("best_random_forest.json")
}

fn default_data_path() -> PathBuf {
    PathBuf::from("stockdata.csv")
}

fn default_index_path() -> PathBuf {
    PathBuf::from("index.html")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            model_path: default_model_path(),
            data_path: default_data_path(),
            index_path: default_index_path(),
            model_sha256: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("PREDICTOR"))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid PREDICTOR_* configuration")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert_eq!(config.data_path, PathBuf::from("stockdata.csv"));
        assert!(config.model_sha256.is_none());
    }

    #[test]
    fn test_empty_source_uses_serde_defaults() {
        let config: ServerConfig = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.index_path, PathBuf::from("index.html"));
    }

    #[test]
    fn test_overrides() {
        let config: ServerConfig = config::Config::builder()
            .set_override("port", 8081)
            .unwrap()
            .set_override("model_path", "models/forest.onnx")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.model_path, PathBuf::from("models/forest.onnx"));
    }
}

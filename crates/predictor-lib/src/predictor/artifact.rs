//! Model artifact loading with checksum validation

use super::regressors::{ForestRegressor, LinearRegressor, OnnxRegressor};
use super::Regressor;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Maximum artifact size accepted from disk (256MB)
const MAX_ARTIFACT_BYTES: u64 = 256 * 1024 * 1024;

/// On-disk encoding of a model artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Onnx,
    Json,
}

impl ArtifactFormat {
    /// Pick the format from the file extension; anything but `.onnx` is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("onnx") => ArtifactFormat::Onnx,
            _ => ArtifactFormat::Json,
        }
    }
}

/// JSON artifact, tagged by the estimator that produced it
#[derive(Deserialize)]
#[serde(tag = "model_type")]
enum JsonModel {
    RandomForestRegressor(ForestRegressor),
    LinearRegression(LinearRegressor),
}

/// A model loaded from disk together with its provenance
pub struct LoadedModel {
    pub regressor: Box<dyn Regressor>,
    pub path: PathBuf,
    pub checksum: String,
    pub size_bytes: usize,
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Parse model bytes in the given format.
///
/// `n_features` fixes the input width of ONNX graphs; JSON artifacts carry
/// their own width.
pub fn parse_model(
    bytes: &[u8],
    format: ArtifactFormat,
    n_features: usize,
) -> Result<Box<dyn Regressor>> {
    match format {
        ArtifactFormat::Onnx => Ok(Box::new(OnnxRegressor::from_bytes(bytes, n_features)?)),
        ArtifactFormat::Json => {
            let model: JsonModel =
                serde_json::from_slice(bytes).context("Failed to parse JSON model")?;
            match model {
                JsonModel::RandomForestRegressor(forest) => {
                    forest.validate().context("Invalid random forest")?;
                    Ok(Box::new(forest))
                }
                JsonModel::LinearRegression(linear) => {
                    linear.validate().context("Invalid linear model")?;
                    Ok(Box::new(linear))
                }
            }
        }
    }
}

/// Load a model artifact from disk, validating its checksum when one is given
pub fn load_model(
    path: &Path,
    n_features: usize,
    expected_checksum: Option<&str>,
) -> Result<LoadedModel> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat model file {:?}", path))?;
    if metadata.len() > MAX_ARTIFACT_BYTES {
        bail!(
            "Model file {:?} is {} bytes, limit is {}",
            path,
            metadata.len(),
            MAX_ARTIFACT_BYTES
        );
    }

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read model file {:?}", path))?;

    let checksum = compute_checksum(&bytes);
    if let Some(expected) = expected_checksum {
        if !checksum.eq_ignore_ascii_case(expected.trim()) {
            bail!(
                "Checksum mismatch for {:?}: expected {}, got {}",
                path,
                expected,
                checksum
            );
        }
        debug!(checksum = %checksum, "Model checksum validated");
    }

    let format = ArtifactFormat::from_path(path);
    let regressor = parse_model(&bytes, format, n_features)
        .with_context(|| format!("Failed to load model {:?}", path))?;

    info!(
        path = %path.display(),
        format = ?format,
        checksum = %checksum,
        size_bytes = bytes.len(),
        "Model artifact loaded"
    );

    Ok(LoadedModel {
        regressor,
        path: path.to_path_buf(),
        checksum,
        size_bytes: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FOREST_JSON: &str = r#"{
        "model_type": "RandomForestRegressor",
        "n_features": 7,
        "parameters": {"n_estimators": 2, "max_depth": 1, "random_state": 42},
        "trees": [
            {
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [4, -2, -2],
                "threshold": [0.0, -2.0, -2.0],
                "value": [0.0, -1.0, 1.0]
            },
            {
                "children_left": [-1],
                "children_right": [-1],
                "feature": [-2],
                "threshold": [-2.0],
                "value": [0.5]
            }
        ]
    }"#;

    fn write_temp(contents: &[u8], suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum(b"model");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum(b"model"));
        assert_ne!(checksum, compute_checksum(b"other"));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ArtifactFormat::from_path(Path::new("m.onnx")), ArtifactFormat::Onnx);
        assert_eq!(ArtifactFormat::from_path(Path::new("m.ONNX")), ArtifactFormat::Onnx);
        assert_eq!(ArtifactFormat::from_path(Path::new("m.json")), ArtifactFormat::Json);
        assert_eq!(ArtifactFormat::from_path(Path::new("model")), ArtifactFormat::Json);
    }

    #[test]
    fn test_parse_forest_json() {
        let model = parse_model(FOREST_JSON.as_bytes(), ArtifactFormat::Json, 7).unwrap();
        let desc = model.describe();
        assert_eq!(desc.model_type, "RandomForestRegressor");
        assert_eq!(desc.n_estimators, Some(2));
        assert_eq!(desc.parameters["random_state"], 42);

        let input = [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        assert_eq!(model.predict(&input).unwrap(), 0.75);
    }

    #[test]
    fn test_parse_linear_json() {
        let json = r#"{
            "model_type": "LinearRegression",
            "coefficients": [1, 0, 0],
            "intercept": 2.0
        }"#;
        let model = parse_model(json.as_bytes(), ArtifactFormat::Json, 3).unwrap();
        assert_eq!(model.predict(&[3.0, 9.0, 9.0]).unwrap(), 5.0);
    }

    #[test]
    fn test_unknown_model_type_rejected() {
        let json = r#"{"model_type": "KMeans", "n_clusters": 3}"#;
        assert!(parse_model(json.as_bytes(), ArtifactFormat::Json, 7).is_err());
    }

    #[test]
    fn test_load_model_with_checksum() {
        let file = write_temp(FOREST_JSON.as_bytes(), ".json");
        let expected = compute_checksum(FOREST_JSON.as_bytes());

        let loaded = load_model(file.path(), 7, Some(&expected)).unwrap();
        assert_eq!(loaded.checksum, expected);
        assert_eq!(loaded.size_bytes, FOREST_JSON.len());

        let err = load_model(file.path(), 7, Some("deadbeef")).err().unwrap();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_model(Path::new("/nonexistent/model.json"), 7, None).is_err());
    }

    #[test]
    fn test_load_invalid_onnx() {
        let file = write_temp(b"not an onnx graph", ".onnx");
        assert!(load_model(file.path(), 7, None).is_err());
    }
}

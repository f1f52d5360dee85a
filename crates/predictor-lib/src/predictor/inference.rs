//! Preprocessing and inverse scaling around the regression model
//!
//! The scaler was fit on every column including `year`, so a request row is
//! scaled with a placeholder year and the scaled placeholder is dropped
//! before inference. The model's scaled output is mapped back to a calendar
//! year by placing it in a zero-filled full-width row and inverse scaling.

use super::features::FeatureExtractor;
use super::Regressor;
use crate::error::PredictError;
use crate::models::FeatureVector;
use crate::scaler::StandardScaler;
use crate::schema::{FeatureSchema, SchemaError};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// Value substituted for the unknown `year` before scaling
pub const YEAR_PLACEHOLDER: f64 = 0.0;

/// Confidence statement reported with every prediction
pub const MODEL_CONFIDENCE: &str = "High (R² > 0.99 on test data)";

/// Inference latency above which a warning is logged
const MAX_INFERENCE_MS: u128 = 5;

/// Scaled model input: every scaler column except the target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledVector(Vec<f64>);

impl ScaledVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of a single prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// Recovered year, rounded half-to-even
    pub year: i64,
    /// Raw model output in scaled space
    pub scaled: f64,
    /// Recovered year before rounding
    pub unrounded_year: f64,
}

/// Inference statistics
#[derive(Debug, Clone)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}

/// Model + fitted scaler + the shared column layout
///
/// Either artifact may be absent when it failed to load at startup; every
/// prediction is then rejected as not initialized.
pub struct Predictor {
    model: Option<Box<dyn Regressor>>,
    scaler: Option<StandardScaler>,
    extractor: FeatureExtractor,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl Predictor {
    /// Assemble a predictor, checking the model width against the scaler schema
    pub fn new(
        model: Option<Box<dyn Regressor>>,
        scaler: Option<StandardScaler>,
    ) -> Result<Self, SchemaError> {
        if let (Some(model), Some(scaler)) = (&model, &scaler) {
            if let Some(n_features) = model.n_features() {
                scaler.schema().check_input_width(n_features)?;
            }
        }

        Ok(Self {
            model,
            scaler,
            extractor: FeatureExtractor::new(),
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        })
    }

    /// Predictor with neither artifact loaded
    pub fn uninitialized() -> Self {
        Self {
            model: None,
            scaler: None,
            extractor: FeatureExtractor::new(),
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        }
    }

    /// Replace the feature extractor (fixes "today" in tests)
    pub fn with_extractor(mut self, extractor: FeatureExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some() && self.scaler.is_some()
    }

    pub fn model(&self) -> Option<&dyn Regressor> {
        self.model.as_deref()
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    pub fn schema(&self) -> Option<&FeatureSchema> {
        self.scaler.as_ref().map(StandardScaler::schema)
    }

    fn require_scaler(&self) -> Result<&StandardScaler, PredictError> {
        self.scaler
            .as_ref()
            .ok_or_else(|| PredictError::NotInitialized("Scaler not initialized".to_string()))
    }

    fn require_model(&self) -> Result<&dyn Regressor, PredictError> {
        self.model
            .as_deref()
            .ok_or_else(|| PredictError::NotInitialized("Model not initialized".to_string()))
    }

    /// Validate raw request input and scale it into model space
    pub fn preprocess(&self, input: &Map<String, Value>) -> Result<ScaledVector, PredictError> {
        self.require_scaler()?;
        let features = self.extractor.extract(input)?;
        self.scale_features(&features)
    }

    /// Scale an already validated feature vector, ignoring its `year`
    pub fn scale_features(&self, features: &FeatureVector) -> Result<ScaledVector, PredictError> {
        let scaler = self.require_scaler()?;
        let schema = scaler.schema();

        let mut row = features.to_row(schema);
        row[schema.target_index()] = YEAR_PLACEHOLDER;

        let scaled = scaler.transform(&row)?;
        Ok(ScaledVector(schema.drop_target(&scaled)))
    }

    /// Run the model on a scaled vector and recover the year
    pub fn predict(&self, scaled: &ScaledVector) -> Result<Prediction, PredictError> {
        let model = self.require_model()?;
        let scaler = self.require_scaler()?;
        scaler.schema().check_input_width(scaled.len())?;

        let start = Instant::now();
        let output = model
            .predict(scaled.as_slice())
            .map_err(|e| PredictError::internal(format!("Model inference failed: {:#}", e)))?;
        let elapsed = start.elapsed();

        self.inference_count.fetch_add(1, Ordering::Relaxed);
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(
                elapsed_ms = elapsed.as_millis(),
                "Inference exceeded {}ms target", MAX_INFERENCE_MS
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        if !output.is_finite() {
            return Err(PredictError::internal(format!(
                "Model produced a non-finite output: {}",
                output
            )));
        }

        let year = recover_target(scaler, output)?;
        Ok(Prediction {
            year: year.round_ties_even() as i64,
            scaled: output,
            unrounded_year: year,
        })
    }

    /// `predict ∘ preprocess`
    pub fn predict_raw(&self, input: &Map<String, Value>) -> Result<Prediction, PredictError> {
        if !self.is_ready() {
            return Err(PredictError::NotInitialized(
                "Model or scaler not initialized".to_string(),
            ));
        }
        let scaled = self.preprocess(input)?;
        self.predict(&scaled)
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

/// Inverse-scale a single target value through a zero-filled full-width row
fn recover_target(scaler: &StandardScaler, scaled_target: f64) -> Result<f64, SchemaError> {
    let schema = scaler.schema();
    let mut row = vec![0.0; schema.len()];
    row[schema.target_index()] = scaled_target;
    let restored = scaler.inverse_transform(&row)?;
    Ok(restored[schema.target_index()])
}

//! Year prediction engine

mod artifact;
mod features;
mod inference;
mod regressors;

pub use artifact::{compute_checksum, load_model, parse_model, ArtifactFormat, LoadedModel};
pub use features::FeatureExtractor;
pub use inference::{
    InferenceStats, Prediction, Predictor, ScaledVector, MODEL_CONFIDENCE, YEAR_PLACEHOLDER,
};
pub use regressors::{DecisionTree, ForestRegressor, LinearRegressor, OnnxRegressor};

use crate::models::ModelDescription;
use anyhow::Result;

/// Trait for regression model implementations
///
/// A regressor maps one scaled input row (every scaler column except the
/// target) to a single scaled output.
pub trait Regressor: Send + Sync {
    /// Predict the scaled target for one scaled input row
    fn predict(&self, input: &[f64]) -> Result<f64>;

    /// Static information about the model
    fn describe(&self) -> ModelDescription;

    /// Number of inputs the model was trained on, if it declares one
    fn n_features(&self) -> Option<usize> {
        self.describe().n_features
    }
}

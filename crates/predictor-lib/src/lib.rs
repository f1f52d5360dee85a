//! Core library for the stock year predictor
//!
//! This crate provides the core functionality for:
//! - Loading the historical dataset and fitting the feature scaler
//! - Loading the regression model artifact
//! - The preprocessing / inverse-scaling contract around the model
//! - Health checks and observability

pub mod dataset;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod scaler;
pub mod schema;

pub use error::PredictError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{Prediction, Predictor, Regressor, ScaledVector};
pub use scaler::StandardScaler;
pub use schema::FeatureSchema;

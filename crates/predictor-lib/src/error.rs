//! Prediction error kinds

use crate::schema::SchemaError;
use thiserror::Error;

/// Failure of a single prediction request
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PredictError {
    /// The request payload is missing or has a malformed field
    #[error("{0}")]
    Validation(String),

    /// The model or scaler failed to load at startup
    #[error("{0}")]
    NotInitialized(String),

    /// Anything else that went wrong while computing the prediction
    #[error("{0}")]
    Internal(String),
}

impl PredictError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::Validation(_) => "validation",
            PredictError::NotInitialized(_) => "not_initialized",
            PredictError::Internal(_) => "internal",
        }
    }
}

impl From<SchemaError> for PredictError {
    fn from(err: SchemaError) -> Self {
        PredictError::Internal(format!("Feature schema mismatch: {}", err))
    }
}

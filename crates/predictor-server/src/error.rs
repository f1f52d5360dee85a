//! HTTP mapping of prediction errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use predictor_lib::PredictError;
use serde_json::json;

/// Prediction error rendered as `{"error": ...}` with a fixed status per kind
#[derive(Debug)]
pub struct ApiError(pub PredictError);

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            PredictError::Validation(_) => StatusCode::BAD_REQUEST,
            PredictError::NotInitialized(_) | PredictError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn message(&self) -> String {
        match &self.0 {
            PredictError::Validation(msg) | PredictError::NotInitialized(msg) => msg.clone(),
            PredictError::Internal(msg) => format!("Unexpected error: {}", msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let PredictError::Internal(detail) = &self.0 {
            tracing::error!(detail = %detail, "Internal prediction error");
        }
        let body = Json(json!({ "error": self.message() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError(PredictError::validation("bad")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(PredictError::NotInitialized("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError(PredictError::internal("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_message_prefixed() {
        assert_eq!(
            ApiError(PredictError::internal("boom")).message(),
            "Unexpected error: boom"
        );
        assert_eq!(
            ApiError(PredictError::validation("Missing required feature: IBM")).message(),
            "Missing required feature: IBM"
        );
    }
}

//! HTTP error responses

use crate::core::DiagnosisError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Problem with the request itself
    #[error("{0}")]
    BadRequest(String),

    /// No usable artifact pair for the named disease
    #[error("{0} model not available")]
    Unavailable(String),

    #[error("Failed to make prediction")]
    Internal(String),

    #[error("Endpoint not found")]
    NotFound,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl From<DiagnosisError> for ApiError {
    fn from(err: DiagnosisError) -> Self {
        match err {
            DiagnosisError::PredictionUnavailable(name) => ApiError::Unavailable(name),
            e if e.is_client_error() => ApiError::BadRequest(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::Internal(detail) => error!("prediction failed: {detail}"),
            ApiError::Unavailable(_) => error!("{self}"),
            _ => {}
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let missing: ApiError = DiagnosisError::MissingField("age".into()).into();
        assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.to_string(), "Missing required field: age");

        let unavailable: ApiError =
            DiagnosisError::PredictionUnavailable("Heart disease".into()).into();
        assert_eq!(unavailable.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(unavailable.to_string(), "Heart disease model not available");

        let internal: ApiError = DiagnosisError::EmptyDataset.into();
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.to_string(), "Failed to make prediction");

        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
    }
}

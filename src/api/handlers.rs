use crate::api::{ApiError, AppState};
use crate::core::PredictionResult;
use crate::disease::Disease;
use crate::service::ModelsLoaded;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

type JsonBody = Result<Json<Value>, JsonRejection>;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub models_loaded: ModelsLoaded,
}

/// Health check endpoint; loads any models not yet loaded
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, ApiError> {
    let service = Arc::clone(&state.service);
    let models_loaded = tokio::task::spawn_blocking(move || service.models_loaded())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Disease Prediction API is running".to_string(),
        models_loaded,
    }))
}

pub async fn predict_diabetes(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<Json<PredictionResult>, ApiError> {
    predict(state, Disease::Diabetes, body).await
}

pub async fn predict_heart(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<Json<PredictionResult>, ApiError> {
    predict(state, Disease::Heart, body).await
}

pub async fn predict_parkinsons(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<Json<PredictionResult>, ApiError> {
    predict(state, Disease::Parkinsons, body).await
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn predict(
    state: AppState,
    disease: Disease,
    body: JsonBody,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(body) = body?;
    let fields = match body {
        Value::Object(fields) => fields,
        _ => {
            return Err(ApiError::BadRequest(
                "Request body must be a JSON object".to_string(),
            ))
        }
    };

    // first use of a disease reads its artifacts from disk
    let service = Arc::clone(&state.service);
    let result = tokio::task::spawn_blocking(move || service.predict(disease, &fields))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(result))
}

use crate::api::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

/// Build the API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/predict/diabetes", post(handlers::predict_diabetes))
        .route("/api/predict/heart", post(handlers::predict_heart))
        .route("/api/predict/parkinsons", post(handlers::predict_parkinsons))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
}

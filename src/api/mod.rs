//! HTTP API over the prediction service

pub mod error;
pub mod handlers;
pub mod routes;

pub use self::error::ApiError;
pub use self::routes::build_router;

use crate::service::PredictionService;
use std::sync::Arc;

/// Shared state injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

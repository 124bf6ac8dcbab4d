/// API request handlers
use std::sync::Arc;

use axum::Json;

use crate::api::types::ApiResponse;
use crate::api::types::HealthResponse;
use crate::rag::ResponseService;

pub mod respond;
pub mod status;

pub use respond::*;
pub use status::*;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ResponseService>,
    pub max_message_length: usize,
}

impl AppState {
    pub fn new(service: Arc<ResponseService>, max_message_length: usize) -> Self {
        Self {
            service,
            max_message_length,
        }
    }
}

/// Health check handler
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Status handler
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::error;
use tracing::info;

use super::AppState;
use crate::api::types::ApiResponse;
use crate::api::types::StatusResponse;

/// Report LLM mode and knowledge data (GET /api/status)
pub async fn get_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StatusResponse>>, StatusCode> {
    info!("GET /api/status");

    if let Err(e) = state.service.initialize().await {
        error!("Failed to load knowledge data: {}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let status = state.service.status();
    Ok(Json(ApiResponse::success(StatusResponse {
        llm_mode_enabled: status.llm_configured,
        llm_active: status.llm_active,
        knowledge_data_present: status.indexed_messages > 0,
        indexed_messages: status.indexed_messages,
        persona_loaded: status.persona_loaded,
        fallback_mode: status.fallback_mode,
    })))
}

/// Reply handler
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::AppState;
use crate::api::types::ApiResponse;
use crate::api::types::RespondRequest;
use crate::api::types::RespondResponse;
use crate::chunking::split_message;
use crate::errors::EchoRagError;

/// Generate a reply (POST /api/respond)
pub async fn respond(
    State(state): State<AppState>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<ApiResponse<RespondResponse>>, StatusCode> {
    info!("POST /api/respond: {}", req.query);

    let query = req.query.trim();
    if query.is_empty() {
        return Ok(Json(ApiResponse::error("query must not be empty")));
    }

    let result = match req.top_k {
        Some(0) => return Ok(Json(ApiResponse::error("top_k must be greater than zero"))),
        Some(top_k) => state.service.generate_response(query, top_k).await,
        None => state.service.generate_response_default(query).await,
    };

    match result {
        Ok(response) => {
            let chunks = split_message(&response, state.max_message_length);
            Ok(Json(ApiResponse::success(RespondResponse { response, chunks })))
        }
        Err(e @ (EchoRagError::ConfigError(_) | EchoRagError::LlmError(_))) => {
            warn!("Reply failed: {}", e);
            Ok(Json(ApiResponse::error(e.to_string())))
        }
        Err(e) => {
            error!("Error generating reply: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

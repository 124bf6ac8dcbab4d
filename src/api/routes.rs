//! API route definitions

use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers::AppState;
use super::handlers::{
    self,
};

/// Create RESTful API router
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Service status
        .route("/status", get(handlers::get_status))
        // Replies
        .route("/respond", post(handlers::respond))
        .with_state(state)
}

//! HTTP server implementation

use std::sync::Arc;

use axum::Router;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing::warn;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::rag::ResponseService;
use crate::Result;

/// Assemble the application router with tracing and optional CORS
pub fn build_router(state: AppState, enable_cors: bool) -> Router {
    let mut app = Router::new()
        .nest("/api", routes::api_routes(state))
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        info!("CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }
    app
}

/// Start the API server
pub async fn serve_api(config: &AppConfig, host: String, port: u16, enable_cors: bool) -> Result<()> {
    info!("Starting echorag API server...");

    let service = Arc::new(ResponseService::from_config(config).await?);
    if let Err(e) = service.initialize().await {
        // Not fatal: the first request retries the load
        warn!("Knowledge data not loaded at startup: {}", e);
    }

    let state = AppState::new(service, config.bot.max_message_length);
    let app = build_router(state, enable_cors);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /api/health   - Health check");
    info!("  GET  /api/status   - LLM mode and knowledge data status");
    info!("  POST /api/respond  - Generate a reply");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::*;
    use crate::llm::LlmResponseGenerator;
    use crate::rag::StaticSource;

    #[tokio::test]
    async fn test_health_route() {
        struct NoEmbedder;

        #[async_trait::async_trait]
        impl crate::embeddings::Embedder for NoEmbedder {
            async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                Ok(vec![0.0])
            }

            fn dimension(&self) -> usize {
                1
            }
        }

        let service = ResponseService::new(
            Arc::new(NoEmbedder),
            Arc::new(StaticSource::default()),
            LlmResponseGenerator::disabled(),
        );
        let app = build_router(AppState::new(Arc::new(service), 2000), true);

        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

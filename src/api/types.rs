//! API request and response types

use serde::Deserialize;
use serde::Serialize;

use crate::config::FallbackMode;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Reply request
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub query: String,
    /// Defaults to `retrieval.top_k`
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Reply, plus the same text split for transports with a message size limit
#[derive(Debug, Serialize, Deserialize)]
pub struct RespondResponse {
    pub response: String,
    pub chunks: Vec<String>,
}

/// Service status
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub llm_mode_enabled: bool,
    pub llm_active: bool,
    pub knowledge_data_present: bool,
    pub indexed_messages: usize,
    pub persona_loaded: bool,
    pub fallback_mode: FallbackMode,
}

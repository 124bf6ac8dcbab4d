use serde::Deserialize;
use serde::Serialize;

/// A stored message text together with its embedding vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedMessage {
    pub text: String,
    pub embedding: Vec<f32>,
}

impl EmbeddedMessage {
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            embedding,
        }
    }
}

/// A historical chat message as persisted by the ingestion job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct KnowledgeMessage {
    pub id: i64,
    pub channel_id: i64,
    pub channel_name: String,
    pub author_id: i64,
    pub author_name: String,
    pub content: String,
    /// ISO-8601 creation time as reported by the chat platform
    pub created_at: String,
    /// Unix timestamp (seconds, fractional)
    pub timestamp: f64,
    pub category: Option<String>,
    pub importance: i64,
}

/// Filter applied when loading embedded messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadFilter {
    pub category: Option<String>,
    pub min_importance: Option<i64>,
}

/// Counters reported by the status surfaces
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeStats {
    pub message_count: i64,
    pub embedding_count: i64,
}

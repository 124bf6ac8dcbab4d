//! Embeddings generation module
//!
//! The embedding model is reached over HTTP:
//! - Ollama (local models such as `all-minilm`, 384 dimensions)
//! - OpenAI-compatible `/embeddings` endpoints
//!
//! Everything downstream only sees the [`Embedder`] trait, so tests and
//! alternative backends can plug in without touching the retriever.
//!
//! # Examples
//!
//! ```rust,no_run
//! use echorag::config::AppConfig;
//! use echorag::embeddings::Embedder;
//! use echorag::embeddings::EmbeddingClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let client = EmbeddingClient::from_app_config(&config)?;
//!
//!     let embedding = client.embed("こんにちは").await?;
//!     println!("Generated embedding with {} dimensions", embedding.len());
//!
//!     Ok(())
//! }
//! ```

pub mod backfill;
pub mod client;

use async_trait::async_trait;
pub use backfill::backfill_embeddings;
pub use backfill::BackfillStats;
pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;

use crate::errors::EchoRagError;
use crate::errors::Result;

/// Maximum number of texts embedded concurrently by the backfill job
pub const MAX_BATCH_SIZE: usize = 64;

/// Opaque text → vector function
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimension of every vector this embedder produces
    fn dimension(&self) -> usize;
}

/// Normalise text before embedding: collapse runs of whitespace and reject
/// input that is empty once trimmed.
pub fn preprocess_text_for_embedding(text: &str) -> Result<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Err(EchoRagError::EmbeddingError(
            "Cannot embed empty text".to_string(),
        ));
    }
    Ok(collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_collapses_whitespace() {
        assert_eq!(
            preprocess_text_for_embedding("  hello \n\n world\t").unwrap(),
            "hello world"
        );
    }

    #[test]
    fn test_preprocess_rejects_blank() {
        assert!(matches!(
            preprocess_text_for_embedding(" \n "),
            Err(EchoRagError::EmbeddingError(_))
        ));
    }
}

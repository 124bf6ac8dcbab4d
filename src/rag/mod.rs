//! Retrieval-augmented reply generation over a personal message history
//!
//! This module turns an incoming query into a reply in the persona's voice:
//! - Similarity retrieval over an in-memory embedding index
//! - Heuristic composition from retrieved messages (no network)
//! - Optional LLM generation with the retrieved messages as context
//! - Orchestration with lazy, one-time initialization
//!
//! # Examples
//!
//! ```rust,no_run
//! use echorag::config::AppConfig;
//! use echorag::rag::ResponseService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = ResponseService::from_config(&config).await?;
//!
//!     let reply = service.generate_response_default("おはよう").await?;
//!     println!("{reply}");
//!
//!     Ok(())
//! }
//! ```

pub mod composer;
pub mod index;
pub mod pipeline;
pub mod retriever;

pub use composer::QueryIntent;
pub use composer::ResponseComposer;
pub use index::EmbeddingIndex;
pub use index::EmbeddingSource;
pub use index::StaticSource;
pub use pipeline::PersonaSource;
pub use pipeline::ResponseService;
pub use pipeline::ServiceStatus;
pub use retriever::SimilarityRetriever;

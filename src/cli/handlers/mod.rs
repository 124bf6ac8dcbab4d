//! CLI command handlers module
//!
//! This module is organized by functional domains:
//! - init: Knowledge store initialization and message import
//! - embeddings: Embedding backfill
//! - rag: Replies and similarity search
//! - persona: Persona profile analysis
//! - info: Status and configuration display
//! - serve: API server

pub mod embeddings;
pub mod info;
pub mod init;
pub mod persona;
pub mod rag;
pub mod serve;

// Re-export all public handlers
pub use embeddings::*;
pub use info::*;
pub use init::*;
pub use persona::*;
pub use rag::*;
pub use serve::*;

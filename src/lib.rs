//! echorag: persona-style chat replies from a personal message history.
//!
//! Historical messages are embedded and stored in SQLite. For each incoming
//! query the most similar messages are retrieved and turned into a reply,
//! either by an LLM with the messages as context or by deterministic
//! text-stitching heuristics driven by a persona profile.

pub mod api;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod models;
pub mod persona;
pub mod rag;

pub use config::AppConfig;
pub use config::FallbackMode;
pub use errors::*;
pub use persona::PersonaProfile;
pub use rag::ResponseService;

//! LLM-backed reply generation
//!
//! - [`client`]: the [`TextGenerator`] trait and the Gemini REST backend
//! - [`prompts`]: prompt template loading and environment overrides
//! - [`retry`]: failure classification and exponential backoff
//! - [`generator`]: the retrying [`LlmResponseGenerator`]

pub mod client;
pub mod generator;
pub mod prompts;
pub mod retry;

pub use client::GeminiClient;
pub use client::GenerationSettings;
pub use client::TextGenerator;
pub use generator::LlmOutcome;
pub use generator::LlmResponseGenerator;
pub use prompts::PromptOverrides;
pub use prompts::PromptStore;
pub use prompts::PromptTemplate;
pub use retry::ErrorKind;
pub use retry::GenerationError;

//! LLM reply generation with bounded retries

use std::sync::Arc;
use std::sync::Once;

use tracing::debug;
use tracing::info;

use super::client::GeminiClient;
use super::client::TextGenerator;
use super::prompts::PromptStore;
use super::retry::RetryDecision;
use super::retry::RetryState;
use crate::config::AppConfig;
use crate::errors::Result;

/// Result of one generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmOutcome {
    /// Non-empty text from the model
    Response(String),
    /// Terminal failure with a human-readable explanation
    Failed(String),
    /// No API key is configured; nothing was attempted
    NotConfigured,
}

impl LlmOutcome {
    /// `(response, error)` pair; both are `None` only when not configured
    pub fn into_pair(self) -> (Option<String>, Option<String>) {
        match self {
            Self::Response(text) => (Some(text), None),
            Self::Failed(message) => (None, Some(message)),
            Self::NotConfigured => (None, None),
        }
    }
}

/// Builds the prompt, calls the backend and retries transient failures.
///
/// Never returns an error: every path ends in an [`LlmOutcome`].
pub struct LlmResponseGenerator {
    backend: Option<Arc<dyn TextGenerator>>,
    prompts: Arc<PromptStore>,
    max_context_messages: usize,
    first_success: Once,
}

impl LlmResponseGenerator {
    pub fn new(
        backend: Option<Arc<dyn TextGenerator>>,
        prompts: Arc<PromptStore>,
        max_context_messages: usize,
    ) -> Self {
        Self {
            backend,
            prompts,
            max_context_messages,
            first_success: Once::new(),
        }
    }

    /// Generator without a backend; always reports `NotConfigured`
    pub fn disabled() -> Self {
        Self::new(None, Arc::new(PromptStore::default()), 0)
    }

    /// Use Gemini when an API key is configured
    pub fn from_config(config: &AppConfig, prompts: Arc<PromptStore>) -> Result<Self> {
        let backend = GeminiClient::from_app_config(config)?.map(|client| {
            info!("LLM backend configured: {}", client.model());
            Arc::new(client) as Arc<dyn TextGenerator>
        });
        Ok(Self::new(
            backend,
            prompts,
            config.retrieval.max_context_messages,
        ))
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// Whether any call in this process has succeeded yet
    pub fn has_succeeded(&self) -> bool {
        self.first_success.is_completed()
    }

    /// Ask the model to answer `query` using `retrieved` as context
    pub async fn generate(&self, query: &str, retrieved: &[String]) -> LlmOutcome {
        let Some(backend) = &self.backend else {
            return LlmOutcome::NotConfigured;
        };

        let template = self.prompts.current();
        let prompt = template.render(query, retrieved, self.max_context_messages);
        debug!(
            "LLM request: query length {}, {} context messages",
            query.chars().count(),
            retrieved.len().min(self.max_context_messages)
        );

        let mut state = RetryState::default();
        loop {
            match backend.generate(&prompt).await {
                Ok(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        debug!("LLM returned an empty response");
                        return LlmOutcome::Failed(
                            "The LLM returned an empty response.".to_string(),
                        );
                    }
                    self.first_success.call_once(|| {
                        info!("LLM mode active: first successful response received");
                    });
                    debug!("LLM response length {}", text.chars().count());
                    return LlmOutcome::Response(text.to_string());
                }
                Err(error) => match state.record_failure(&error) {
                    RetryDecision::Retry(wait) => tokio::time::sleep(wait).await,
                    RetryDecision::GiveUp(message) => return LlmOutcome::Failed(message),
                },
            }
        }
    }
}

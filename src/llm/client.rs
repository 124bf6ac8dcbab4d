//! Text generation backends
//!
//! [`GeminiClient`] talks to the Gemini `generateContent` REST endpoint.
//! Failures come back as [`GenerationError`] already classified, so the retry
//! loop never has to look at HTTP details.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::retry::ErrorKind;
use super::retry::GenerationError;
use crate::config::AppConfig;
use crate::config::LlmConfig;
use crate::errors::EchoRagError;
use crate::errors::Result;

/// A remote model that turns a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError>;
}

/// Harm categories the safety threshold is applied to
const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Sampling and transport parameters for one call
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
    pub safety_threshold: String,
}

impl From<&LlmConfig> for GenerationSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature.clamp(0.0, 1.0),
            max_output_tokens: config.max_output_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
            safety_threshold: config.safety_threshold.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct SafetySetting<'a> {
    category: &'a str,
    threshold: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, or a content-filter error
    fn into_text(self) -> std::result::Result<String, GenerationError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GenerationError::new(
                ErrorKind::ContentFilter,
                format!("Prompt blocked: {reason}"),
            ));
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Ok(String::new());
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() && candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(GenerationError::new(
                ErrorKind::ContentFilter,
                "Response blocked: SAFETY",
            ));
        }
        Ok(text)
    }
}

/// Gemini REST client
pub struct GeminiClient {
    endpoint: String,
    model: String,
    api_key: String,
    settings: GenerationSettings,
    client: Client,
}

impl GeminiClient {
    pub fn new(
        endpoint: String,
        model: String,
        api_key: String,
        settings: GenerationSettings,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(EchoRagError::ConfigError(
                "Gemini API key must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(settings.timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            api_key,
            settings,
            client,
        })
    }

    /// Build a client when an API key is configured, `None` otherwise
    pub fn from_app_config(config: &AppConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.llm_api_key() else {
            return Ok(None);
        };
        Self::new(
            config.llm.endpoint.clone(),
            config.llm.model.clone(),
            api_key,
            GenerationSettings::from(&config.llm),
        )
        .map(Some)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_output_tokens,
            },
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: &self.settings.safety_threshold,
                })
                .collect(),
        }
    }
}

fn transport_error(error: &reqwest::Error) -> GenerationError {
    if error.is_timeout() {
        GenerationError::new(ErrorKind::Timeout, error.to_string())
    } else {
        GenerationError::classified(error.status().map(|s| s.as_u16()), error.to_string())
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        let url = self.url();
        debug!("Calling Gemini generateContent: {} ({} chars)", url, prompt.len());

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerationError::classified(
                Some(status.as_u16()),
                format!("Gemini API error ({status}): {error_text}"),
            ));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            GenerationError::new(ErrorKind::Unknown, format!("Failed to parse response: {e}"))
        })?;
        body.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        let settings = GenerationSettings::from(&LlmConfig::default());
        GeminiClient::new(
            "https://generativelanguage.googleapis.com/".to_string(),
            "gemini-2.0-flash-lite".to_string(),
            "test-key".to_string(),
            settings,
        )
        .unwrap()
    }

    #[test]
    fn test_url_and_body() {
        let client = client();
        assert_eq!(
            client.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-lite:generateContent"
        );

        let body = serde_json::to_value(client.request_body("hi")).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(body["safetySettings"][0]["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
    }

    #[test]
    fn test_empty_key_rejected() {
        let settings = GenerationSettings::from(&LlmConfig::default());
        let result = GeminiClient::new(
            "http://localhost".to_string(),
            "m".to_string(),
            "  ".to_string(),
            settings,
        );
        assert!(matches!(result, Err(EchoRagError::ConfigError(_))));
    }

    #[test]
    fn test_parse_text_response() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"こんに"},{"text":"ちは"}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(body.into_text().unwrap(), "こんにちは");
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let body: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert_eq!(body.into_text().unwrap_err().kind, ErrorKind::ContentFilter);
    }

    #[test]
    fn test_parse_blocked_candidate() {
        let body: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(body.into_text().unwrap_err().kind, ErrorKind::ContentFilter);
    }

    #[test]
    fn test_parse_no_candidates_is_empty_text() {
        let body: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(body.into_text().unwrap(), "");
    }
}

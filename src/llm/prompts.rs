//! Prompt templates for LLM replies
//!
//! The base template comes from a TOML file (every key optional). Operators
//! can override single fields, or append an extra role to the system prompt,
//! through environment variables without touching the file.

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::errors::Result;

pub const CUSTOM_SYSTEM_PROMPT_ENV: &str = "CUSTOM_SYSTEM_PROMPT";
pub const CUSTOM_RESPONSE_INSTRUCTION_ENV: &str = "CUSTOM_RESPONSE_INSTRUCTION";
pub const CUSTOM_CONTEXT_HEADER_ENV: &str = "CUSTOM_CONTEXT_HEADER";
pub const CUSTOM_QUERY_HEADER_ENV: &str = "CUSTOM_QUERY_HEADER";
pub const CUSTOM_RESPONSE_HEADER_ENV: &str = "CUSTOM_RESPONSE_HEADER";
pub const ADDITIONAL_ROLE_ENV: &str = "ADDITIONAL_CHATBOT_ROLE";

/// Delimiter placed between the system prompt and an additional role
pub const ADDITIONAL_ROLE_HEADER: &str = "【追加の役割・性格】";

/// Structured prompt with one field per section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_response_instruction")]
    pub response_instruction: String,
    #[serde(default = "default_context_header")]
    pub context_header: String,
    #[serde(default = "default_query_header")]
    pub query_header: String,
    #[serde(default = "default_response_header")]
    pub response_header: String,
}

fn default_system_prompt() -> String {
    "あなたはこのコミュニティの過去の会話をもとに質問に答えるアシスタントです。".to_string()
}

fn default_response_instruction() -> String {
    "以下のルールに従って回答してください。\n\
     - 過去メッセージの内容を優先して回答する\n\
     - 過去メッセージの口調や語尾に合わせる\n\
     - 過去メッセージから答えられない場合は推測せず、わからないと答える"
        .to_string()
}

fn default_context_header() -> String {
    "【過去メッセージ】".to_string()
}

fn default_query_header() -> String {
    "【質問】".to_string()
}

fn default_response_header() -> String {
    "【回答】".to_string()
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            response_instruction: default_response_instruction(),
            context_header: default_context_header(),
            query_header: default_query_header(),
            response_header: default_response_header(),
        }
    }
}

impl PromptTemplate {
    /// Parse a template from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Render the full prompt.
    ///
    /// Section order is fixed: system, instruction, context, query, response
    /// header. At most `max_context` retrieved messages are included.
    pub fn render(&self, query: &str, context: &[String], max_context: usize) -> String {
        let context_lines = context
            .iter()
            .take(max_context)
            .map(|message| format!("- {message}"))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "{}\n\n{}\n\n{}\n{}\n\n{}\n{}\n\n{}",
            self.system_prompt,
            self.response_instruction,
            self.context_header,
            context_lines,
            self.query_header,
            query,
            self.response_header
        )
    }

    fn with_overrides(&self, overrides: &PromptOverrides) -> Self {
        let pick = |value: &Option<String>, base: &String| value.clone().unwrap_or_else(|| base.clone());

        let mut template = Self {
            system_prompt: pick(&overrides.system_prompt, &self.system_prompt),
            response_instruction: pick(&overrides.response_instruction, &self.response_instruction),
            context_header: pick(&overrides.context_header, &self.context_header),
            query_header: pick(&overrides.query_header, &self.query_header),
            response_header: pick(&overrides.response_header, &self.response_header),
        };

        if let Some(role) = &overrides.additional_role {
            template.system_prompt = format!(
                "{}\n\n{ADDITIONAL_ROLE_HEADER}\n{role}",
                template.system_prompt
            );
        }
        template
    }
}

/// Snapshot of operator overrides; blank values are dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptOverrides {
    pub system_prompt: Option<String>,
    pub response_instruction: Option<String>,
    pub context_header: Option<String>,
    pub query_header: Option<String>,
    pub response_header: Option<String>,
    pub additional_role: Option<String>,
}

impl PromptOverrides {
    /// Read overrides from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through an arbitrary lookup function
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            system_prompt: get(CUSTOM_SYSTEM_PROMPT_ENV),
            response_instruction: get(CUSTOM_RESPONSE_INSTRUCTION_ENV),
            context_header: get(CUSTOM_CONTEXT_HEADER_ENV),
            query_header: get(CUSTOM_QUERY_HEADER_ENV),
            response_header: get(CUSTOM_RESPONSE_HEADER_ENV),
            additional_role: get(ADDITIONAL_ROLE_ENV),
        }
    }
}

/// Base template plus a cache of the last resolved variant
#[derive(Debug)]
pub struct PromptStore {
    base: PromptTemplate,
    cache: Mutex<Option<(PromptOverrides, Arc<PromptTemplate>)>>,
}

impl Default for PromptStore {
    fn default() -> Self {
        Self::new(PromptTemplate::default())
    }
}

impl PromptStore {
    pub fn new(base: PromptTemplate) -> Self {
        Self {
            base,
            cache: Mutex::new(None),
        }
    }

    /// Load the base template; a missing file means all defaults
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            info!("No prompt file at {}, using default prompts", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let base = PromptTemplate::from_toml_str(&content)?;
        debug!("Loaded prompt template from {}", path.display());
        Ok(Self::new(base))
    }

    pub fn base(&self) -> &PromptTemplate {
        &self.base
    }

    /// Template with the current environment overrides applied
    pub fn current(&self) -> Arc<PromptTemplate> {
        self.resolve(&PromptOverrides::from_env())
    }

    /// Template for a given override snapshot.
    ///
    /// The same snapshot returns the cached template; a different one rebuilds
    /// from the base, so an additional role is never appended twice.
    pub fn resolve(&self, overrides: &PromptOverrides) -> Arc<PromptTemplate> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((snapshot, template)) = cache.as_ref() {
            if snapshot == overrides {
                return Arc::clone(template);
            }
            debug!("Prompt overrides changed, rebuilding template");
        }

        let template = Arc::new(self.base.with_overrides(overrides));
        *cache = Some((overrides.clone(), Arc::clone(&template)));
        template
    }
}

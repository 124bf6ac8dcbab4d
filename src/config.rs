use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::EchoRagError;

/// Environment variable holding the generative API key
pub const LLM_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

fn default_database_url() -> String {
    "sqlite://data/knowledge.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connection_timeout() -> u64 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connection_timeout: default_connection_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub backtrace: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            backtrace: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// `ollama` or `openai`
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}

fn default_embedding_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "all-minilm".to_string()
}

pub(crate) fn default_embedding_dimension() -> usize {
    384
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            endpoint: default_embedding_endpoint(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Overridden by `GEMINI_API_KEY` when that variable is set
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_safety_threshold")]
    pub safety_threshold: String,
}

fn default_llm_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_llm_model() -> String {
    "gemini-2.0-flash-lite".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_safety_threshold() -> String {
    "BLOCK_MEDIUM_AND_ABOVE".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key: None,
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_llm_timeout(),
            safety_threshold: default_safety_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Number of retrieved messages passed to the LLM as context
    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,
}

pub(crate) fn default_top_k() -> usize {
    5
}

fn default_max_context_messages() -> usize {
    5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_messages: default_max_context_messages(),
        }
    }
}

/// Tuning for the heuristic reply composer.
///
/// The defaults target Japanese chat logs; every lexicon can be replaced for
/// other languages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// Character-set Jaccard similarity above which a sentence is a near-duplicate
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,
    /// Sentence-final suffixes that already form a complete grammatical ending
    #[serde(default = "default_complete_endings")]
    pub complete_endings: Vec<String>,
    #[serde(default = "default_greeting_markers")]
    pub greeting_markers: Vec<String>,
    #[serde(default = "default_question_markers")]
    pub question_markers: Vec<String>,
    #[serde(default = "default_full_stop")]
    pub full_stop: String,
    #[serde(default = "default_unknown_response")]
    pub unknown_response: String,
    #[serde(default = "default_min_sentence_chars")]
    pub min_sentence_chars: usize,
    #[serde(default = "default_min_target_length")]
    pub min_target_length: usize,
}

fn default_duplicate_threshold() -> f64 {
    0.6
}

fn default_complete_endings() -> Vec<String> {
    [
        "ます",
        "です",
        "ました",
        "でした",
        "ません",
        "ないです",
        "ますね",
        "ですね",
        "ましょう",
        "でしょう",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

pub(crate) fn default_greeting_markers() -> Vec<String> {
    ["おはよう", "こんにちは", "こんばんは", "お疲れ"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn default_question_markers() -> Vec<String> {
    [
        "？", "?", "ですか", "ますか", "なに", "何", "どう", "いつ", "どこ", "だれ", "誰",
        "どのように", "なぜ", "教えて", "方法", "やり方",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_full_stop() -> String {
    "。".to_string()
}

/// Reply used when retrieval finds nothing
pub const DEFAULT_UNKNOWN_RESPONSE: &str = "わかりません。";

fn default_unknown_response() -> String {
    DEFAULT_UNKNOWN_RESPONSE.to_string()
}

fn default_min_sentence_chars() -> usize {
    3
}

fn default_min_target_length() -> usize {
    100
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: default_duplicate_threshold(),
            complete_endings: default_complete_endings(),
            greeting_markers: default_greeting_markers(),
            question_markers: default_question_markers(),
            full_stop: default_full_stop(),
            unknown_response: default_unknown_response(),
            min_sentence_chars: default_min_sentence_chars(),
            min_target_length: default_min_target_length(),
        }
    }
}

/// What the orchestrator does when the LLM call fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// LLM errors and a missing API key are returned to the caller
    Strict,
    /// LLM errors fall through to the heuristic composer
    #[default]
    Hybrid,
}

impl std::fmt::Display for FallbackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Hybrid => write!(f, "hybrid"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub fallback_mode: FallbackMode,
    #[serde(default = "default_persona_path")]
    pub persona_path: PathBuf,
    #[serde(default = "default_prompts_path")]
    pub prompts_path: PathBuf,
    /// Transport limit for a single outgoing chat message
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
}

fn default_persona_path() -> PathBuf {
    PathBuf::from("data/persona.json")
}

fn default_prompts_path() -> PathBuf {
    PathBuf::from("config/prompts.toml")
}

fn default_max_message_length() -> usize {
    crate::chunking::DEFAULT_MAX_MESSAGE_LENGTH
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            fallback_mode: FallbackMode::default(),
            persona_path: default_persona_path(),
            prompts_path: default_prompts_path(),
            max_message_length: default_max_message_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub enable_cors: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub composer: ComposerConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default config file path
    pub fn load() -> crate::Result<Self> {
        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            warn!("Using config.example.toml. Please create config.toml for production use.");
            Self::from_file("config.example.toml")
        } else {
            Err(EchoRagError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config file found. Please create config.toml or config.example.toml",
            )))
        }
    }

    /// Reject values that would only fail later at request time
    pub fn validate(&self) -> crate::Result<()> {
        if self.embeddings.dimension == 0 {
            return Err(EchoRagError::ConfigError(
                "embeddings.dimension must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.llm.temperature) {
            return Err(EchoRagError::ConfigError(format!(
                "llm.temperature must be within [0, 1], got {}",
                self.llm.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.composer.duplicate_threshold) {
            return Err(EchoRagError::ConfigError(format!(
                "composer.duplicate_threshold must be within [0, 1], got {}",
                self.composer.duplicate_threshold
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(EchoRagError::ConfigError(
                "retrieval.top_k must be greater than zero".to_string(),
            ));
        }
        if self.bot.max_message_length == 0 {
            return Err(EchoRagError::ConfigError(
                "bot.max_message_length must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the LLM API key: environment first, then the config file.
    ///
    /// Blank values count as absent.
    pub fn llm_api_key(&self) -> Option<String> {
        resolve_api_key(
            std::env::var(LLM_API_KEY_ENV).ok(),
            self.llm.api_key.as_deref(),
        )
    }

    /// Whether LLM mode is active (a non-blank API key is available)
    pub fn llm_mode_enabled(&self) -> bool {
        self.llm_api_key().is_some()
    }

    /// Get database URL
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }

    /// Get configured fallback mode
    pub fn fallback_mode(&self) -> FallbackMode {
        self.bot.fallback_mode
    }
}

pub(crate) fn resolve_api_key(env_value: Option<String>, file_value: Option<&str>) -> Option<String> {
    env_value
        .filter(|key| !key.trim().is_empty())
        .or_else(|| {
            file_value
                .filter(|key| !key.trim().is_empty())
                .map(str::to_string)
        })
        .map(|key| key.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.embeddings.dimension, 384);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.bot.fallback_mode, FallbackMode::Hybrid);
        assert!((config.composer.duplicate_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.composer.unknown_response, DEFAULT_UNKNOWN_RESPONSE);
        assert_eq!(config.bot.max_message_length, 2000);
    }

    #[test]
    fn test_example_file_matches_defaults() {
        let example = AppConfig::from_toml_str(include_str!("../config.example.toml")).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(example.database.url, defaults.database.url);
        assert_eq!(example.llm.model, defaults.llm.model);
        assert_eq!(example.composer.complete_endings, defaults.composer.complete_endings);
        assert_eq!(example.composer.question_markers, defaults.composer.question_markers);
        assert_eq!(example.bot.prompts_path, defaults.bot.prompts_path);
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_toml_str(
            r#"
[llm]
model = "gemini-1.5-flash"
temperature = 0.2

[bot]
fallback_mode = "strict"

[composer]
duplicate_threshold = 0.8
complete_endings = ["desu", "masu"]
"#,
        )
        .unwrap();

        assert_eq!(config.llm.model, "gemini-1.5-flash");
        assert_eq!(config.llm.max_output_tokens, 1024);
        assert_eq!(config.fallback_mode(), FallbackMode::Strict);
        assert_eq!(config.composer.complete_endings, vec!["desu", "masu"]);
        assert_eq!(config.composer.full_stop, "。");
    }

    #[test]
    fn test_invalid_temperature_rejected() {
        let err = AppConfig::from_toml_str("[llm]\ntemperature = 1.5\n").unwrap_err();
        assert!(matches!(err, EchoRagError::ConfigError(_)));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let err = AppConfig::from_toml_str("[embeddings]\ndimension = 0\n").unwrap_err();
        assert!(matches!(err, EchoRagError::ConfigError(_)));
    }

    #[test]
    fn test_resolve_api_key_prefers_env() {
        let key = resolve_api_key(Some("env-key".to_string()), Some("file-key"));
        assert_eq!(key.as_deref(), Some("env-key"));
    }

    #[test]
    fn test_resolve_api_key_blank_is_absent() {
        assert_eq!(resolve_api_key(Some("   ".to_string()), None), None);
        assert_eq!(resolve_api_key(Some(String::new()), Some("")), None);
        assert_eq!(
            resolve_api_key(Some("  ".to_string()), Some("file-key")).as_deref(),
            Some("file-key")
        );
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 8080\n").unwrap();
        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
    }
}

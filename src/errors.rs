use thiserror::Error;

#[derive(Error, Debug)]
pub enum EchoRagError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("{0}")]
    Custom(String),
}

impl From<reqwest::Error> for EchoRagError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for EchoRagError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Custom(format!("Background task failed: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, EchoRagError>;

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_custom_error_display() {
        let error = EchoRagError::Custom("Test error message".to_string());
        assert_eq!(format!("{error}"), "Test error message");
    }

    #[test]
    fn test_config_error_display() {
        let error = EchoRagError::ConfigError("GEMINI_API_KEY is not set".to_string());
        assert!(matches!(error, EchoRagError::ConfigError(_)));
        assert!(format!("{error}").contains("configuration"));
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let error = EchoRagError::DimensionMismatch {
            expected: 384,
            actual: 768,
        };
        let display = format!("{error}");
        assert!(display.contains("384"));
        assert!(display.contains("768"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let err: EchoRagError = io_err.into();
        assert!(matches!(err, EchoRagError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: EchoRagError = json_err.into();
        assert!(matches!(err, EchoRagError::Serialization(_)));
    }
}

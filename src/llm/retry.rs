//! Failure classification and bounded exponential backoff for LLM calls

use std::fmt;
use std::time::Duration;

use tracing::debug;
use tracing::info;
use tracing::warn;

/// Retries after the first attempt; at most `MAX_RETRIES + 1` calls are made
pub const MAX_RETRIES: u32 = 3;
/// Wait before the first retry
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Wait before the last retry, `INITIAL_BACKOFF * 2^(MAX_RETRIES - 1)`
pub const MAX_BACKOFF: Duration = Duration::from_secs(1 << (MAX_RETRIES - 1));

/// Classified cause of a failed generation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    RateLimit,
    Timeout,
    Permission,
    ContentFilter,
    Unknown,
}

impl ErrorKind {
    /// Only transient failures are worth another attempt
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimit | Self::Timeout)
    }

    /// Message suitable for showing to the person who asked
    pub fn user_message(self, detail: &str) -> String {
        match self {
            Self::Authentication => {
                "The LLM API key is invalid. Check the GEMINI_API_KEY setting.".to_string()
            }
            Self::RateLimit => {
                "The LLM API rate limit was reached. Please wait a moment and try again."
                    .to_string()
            }
            Self::Timeout => {
                "The LLM API did not respond in time. Check the network connection.".to_string()
            }
            Self::Permission => {
                "The API key is not permitted to use this model. Check the key's permissions."
                    .to_string()
            }
            Self::ContentFilter => {
                "The response was blocked by the safety filter. Try rephrasing the question."
                    .to_string()
            }
            Self::Unknown => format!("Unexpected LLM error: {detail}"),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Authentication => "authentication",
            Self::RateLimit => "rate limit",
            Self::Timeout => "timeout",
            Self::Permission => "permission",
            Self::ContentFilter => "content filter",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Error returned by a [`TextGenerator`](super::TextGenerator) backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct GenerationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl GenerationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify from an HTTP status (if any) and the provider's error text
    pub fn classified(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: classify_error(status, &message),
            message,
        }
    }
}

/// Map a provider failure onto an [`ErrorKind`].
///
/// The status code wins when it is unambiguous; otherwise the message text is
/// matched, authentication first.
pub fn classify_error(status: Option<u16>, message: &str) -> ErrorKind {
    match status {
        Some(401) => return ErrorKind::Authentication,
        Some(403) => return ErrorKind::Permission,
        Some(429) => return ErrorKind::RateLimit,
        Some(408 | 504) => return ErrorKind::Timeout,
        _ => {}
    }

    let lower = message.to_lowercase();
    if lower.contains("invalid") || lower.contains("api key not valid") {
        ErrorKind::Authentication
    } else if lower.contains("resourceexhausted")
        || lower.contains("resource_exhausted")
        || lower.contains("resource has been exhausted")
        || lower.contains("429")
        || lower.contains("rate limit")
    {
        ErrorKind::RateLimit
    } else if lower.contains("deadlineexceeded")
        || lower.contains("deadline_exceeded")
        || lower.contains("timeout")
        || lower.contains("timed out")
    {
        ErrorKind::Timeout
    } else if lower.contains("permissiondenied")
        || lower.contains("permission_denied")
        || lower.contains("permission denied")
    {
        ErrorKind::Permission
    } else if lower.contains("blocked") || lower.contains("safety") {
        ErrorKind::ContentFilter
    } else {
        ErrorKind::Unknown
    }
}

/// Wait before retry number `attempt` (0-based): `min(INITIAL_BACKOFF * 2^attempt, MAX_BACKOFF)`
pub fn calculate_backoff(attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    INITIAL_BACKOFF.saturating_mul(factor).min(MAX_BACKOFF)
}

/// What to do after a failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp(String),
}

/// Per-call retry bookkeeping
#[derive(Debug, Default, Clone)]
pub struct RetryState {
    pub attempt: u32,
    pub last_error: Option<ErrorKind>,
}

impl RetryState {
    /// Record a failure and decide whether to try again
    pub fn record_failure(&mut self, error: &GenerationError) -> RetryDecision {
        let kind = error.kind;
        self.last_error = Some(kind);

        match kind {
            ErrorKind::ContentFilter => info!("LLM response blocked by content filter: {}", error),
            ErrorKind::Unknown => debug!("Unclassified LLM error: {}", error),
            _ => warn!("LLM call failed ({}): {}", kind, error.message),
        }

        if !kind.is_retryable() {
            return RetryDecision::GiveUp(kind.user_message(&error.message));
        }

        if self.attempt >= MAX_RETRIES {
            warn!("LLM call gave up after {} retries", MAX_RETRIES);
            return RetryDecision::GiveUp(format!(
                "Gave up after {} retries. {}",
                MAX_RETRIES,
                kind.user_message(&error.message)
            ));
        }

        let wait = calculate_backoff(self.attempt);
        info!(
            "Retrying LLM call ({}/{}) in {:.1}s",
            self.attempt + 1,
            MAX_RETRIES,
            wait.as_secs_f64()
        );
        self.attempt += 1;
        RetryDecision::Retry(wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(calculate_backoff(0), Duration::from_secs(1));
        assert_eq!(calculate_backoff(1), Duration::from_secs(2));
        assert_eq!(calculate_backoff(2), Duration::from_secs(4));
        assert_eq!(calculate_backoff(3), MAX_BACKOFF);
        assert_eq!(calculate_backoff(40), MAX_BACKOFF);
        assert_eq!(MAX_BACKOFF, INITIAL_BACKOFF * 4);
    }

    #[test]
    fn test_classify_by_status() {
        assert_eq!(classify_error(Some(401), ""), ErrorKind::Authentication);
        assert_eq!(classify_error(Some(403), ""), ErrorKind::Permission);
        assert_eq!(classify_error(Some(429), ""), ErrorKind::RateLimit);
        assert_eq!(classify_error(Some(504), ""), ErrorKind::Timeout);
        assert_eq!(classify_error(Some(500), "internal"), ErrorKind::Unknown);
    }

    #[test]
    fn test_classify_by_message() {
        assert_eq!(
            classify_error(Some(400), "API key not valid. Please pass a valid API key."),
            ErrorKind::Authentication
        );
        assert_eq!(
            classify_error(None, "RESOURCE_EXHAUSTED: quota"),
            ErrorKind::RateLimit
        );
        assert_eq!(classify_error(None, "request timed out"), ErrorKind::Timeout);
        assert_eq!(
            classify_error(None, "PERMISSION_DENIED on model"),
            ErrorKind::Permission
        );
        assert_eq!(
            classify_error(None, "Response blocked: SAFETY"),
            ErrorKind::ContentFilter
        );
        assert_eq!(classify_error(None, "connection reset"), ErrorKind::Unknown);
    }

    #[test]
    fn test_only_transient_errors_retry() {
        assert!(ErrorKind::RateLimit.is_retryable());
        assert!(ErrorKind::Timeout.is_retryable());
        for kind in [
            ErrorKind::Authentication,
            ErrorKind::Permission,
            ErrorKind::ContentFilter,
            ErrorKind::Unknown,
        ] {
            assert!(!kind.is_retryable());
        }
    }

    #[test]
    fn test_retry_state_gives_up_after_max_retries() {
        let mut state = RetryState::default();
        let error = GenerationError::new(ErrorKind::Timeout, "slow");
        let mut waits = Vec::new();
        loop {
            match state.record_failure(&error) {
                RetryDecision::Retry(wait) => waits.push(wait),
                RetryDecision::GiveUp(message) => {
                    assert!(message.contains("did not respond in time"));
                    break;
                }
            }
        }
        assert_eq!(
            waits,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
        assert_eq!(state.attempt, MAX_RETRIES);
        assert_eq!(state.last_error, Some(ErrorKind::Timeout));
    }

    #[test]
    fn test_retry_state_terminal_error() {
        let mut state = RetryState::default();
        let decision = state.record_failure(&GenerationError::new(ErrorKind::Unknown, "boom"));
        assert_eq!(
            decision,
            RetryDecision::GiveUp("Unexpected LLM error: boom".to_string())
        );
        assert_eq!(state.attempt, 0);
    }
}

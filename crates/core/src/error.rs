//! Error types for the PathCoach domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`OrchestrationError`] is the
//! single failure value a conversation invocation reports to its caller.

use thiserror::Error;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// A non-2xx, non-429 response. The body is kept for logging only.
    #[error("API request failed with status {status_code}")]
    ApiError { status_code: u16, body: String },

    #[error("Rate limited by provider on all {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Unknown tool {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool_name}: {reason}")]
    MalformedArguments { tool_name: String, reason: String },

    #[error("{tool_name} failed: {source}")]
    Store {
        tool_name: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Why a conversation invocation failed.
///
/// Tool-level problems never appear here: they are reported to the model as
/// tool results and the conversation continues.
#[derive(Debug, Clone, Error)]
pub enum OrchestrationError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("completion service kept rate limiting after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error("model returned no usable content")]
    EmptyCompletion,

    #[error("no response from model after {rounds} rounds")]
    NoResponseAfterRounds { rounds: u32 },
}

/// The taxonomy kind of an [`OrchestrationError`], for callers that branch on
/// the failure class rather than the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Configuration,
    Transport,
    RateLimitExhausted,
    EmptyCompletion,
    NoResponseAfterRounds,
}

impl OrchestrationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Configuration(_) => FailureKind::Configuration,
            Self::Transport(_) => FailureKind::Transport,
            Self::RateLimitExhausted { .. } => FailureKind::RateLimitExhausted,
            Self::EmptyCompletion => FailureKind::EmptyCompletion,
            Self::NoResponseAfterRounds { .. } => FailureKind::NoResponseAfterRounds,
        }
    }
}

impl From<ProviderError> for OrchestrationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimitExhausted { attempts } => Self::RateLimitExhausted { attempts },
            ProviderError::NotConfigured(msg) => Self::Configuration(msg),
            // Response bodies stay in the logs.
            ProviderError::ApiError { status_code, .. } => {
                Self::Transport(format!("completion service returned HTTP {status_code}"))
            }
            ProviderError::InvalidResponse(msg) | ProviderError::Network(msg) => {
                Self::Transport(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_hides_body_from_orchestration_failure() {
        let err = ProviderError::ApiError {
            status_code: 400,
            body: r#"{"error":{"message":"secret details"}}"#.into(),
        };
        let failure = OrchestrationError::from(err);
        assert_eq!(failure.kind(), FailureKind::Transport);
        assert!(failure.to_string().contains("400"));
        assert!(!failure.to_string().contains("secret details"));
    }

    #[test]
    fn rate_limit_maps_to_its_own_kind() {
        let failure = OrchestrationError::from(ProviderError::RateLimitExhausted { attempts: 3 });
        assert_eq!(failure.kind(), FailureKind::RateLimitExhausted);
        assert!(failure.to_string().contains('3'));
    }

    #[test]
    fn missing_credential_is_configuration() {
        let failure = OrchestrationError::from(ProviderError::NotConfigured("no key".into()));
        assert_eq!(failure.kind(), FailureKind::Configuration);
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = ToolError::MalformedArguments {
            tool_name: "get_progress".into(),
            reason: "missing field `userId`".into(),
        };
        assert!(err.to_string().contains("get_progress"));
        assert!(err.to_string().contains("userId"));
    }
}

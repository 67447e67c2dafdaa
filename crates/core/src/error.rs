//! Error types for the Wayfarer domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; provider errors carry
//! enough classification (kind, status, retryability) for the retry
//! wrapper and the agent loop to decide what to do without string matching.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for all Wayfarer operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Coarse classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    InvalidKey,
    RateLimited,
    QuotaExceeded,
    ModelNotFound,
    ContextTooLong,
    ToolCallMalformed,
    Overloaded,
    Network,
    InvalidResponse,
    NotConfigured,
    Generic,
}

/// A classified completion failure.
///
/// Display strings are written for end users; raw response bodies only
/// survive inside [`ProviderError::Api`] and are sanitised by the agent
/// before they reach the UI.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("The API key was rejected by {provider}")]
    InvalidKey { provider: String },

    #[error("{provider} is rate limiting requests")]
    RateLimited { provider: String },

    #[error("The {provider} account has run out of quota or credits")]
    QuotaExceeded { provider: String },

    #[error("Model '{model}' was not found")]
    ModelNotFound { model: String },

    #[error("The conversation is too long for the model's context window")]
    ContextTooLong,

    #[error("The model produced a tool call the API could not parse")]
    ToolCallMalformed {
        status_code: u16,
        failed_generation: Option<String>,
    },

    #[error("{provider} is temporarily overloaded")]
    Overloaded { provider: String, status_code: u16 },

    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response from provider: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// The classification bucket for this error.
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::InvalidKey { .. } => ProviderErrorKind::InvalidKey,
            Self::RateLimited { .. } => ProviderErrorKind::RateLimited,
            Self::QuotaExceeded { .. } => ProviderErrorKind::QuotaExceeded,
            Self::ModelNotFound { .. } => ProviderErrorKind::ModelNotFound,
            Self::ContextTooLong => ProviderErrorKind::ContextTooLong,
            Self::ToolCallMalformed { .. } => ProviderErrorKind::ToolCallMalformed,
            Self::Overloaded { .. } => ProviderErrorKind::Overloaded,
            Self::Network(_) => ProviderErrorKind::Network,
            Self::InvalidResponse(_) => ProviderErrorKind::InvalidResponse,
            Self::NotConfigured(_) => ProviderErrorKind::NotConfigured,
            Self::Api { .. } => ProviderErrorKind::Generic,
        }
    }

    /// HTTP status code the error was derived from, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::InvalidKey { .. } => Some(401),
            Self::RateLimited { .. } => Some(429),
            Self::ToolCallMalformed { status_code, .. }
            | Self::Overloaded { status_code, .. }
            | Self::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Whether a retry with backoff has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Overloaded { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// Whether this is a rate-limit failure (uses the longer backoff).
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Memory store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Permission denied: {tool_name}: {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Not supported on this system: {0}")]
    Unsupported(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::Api {
            status_code: 418,
            message: "I'm a teapot".into(),
        });
        assert!(err.to_string().contains("418"));
        assert!(err.to_string().contains("teapot"));
    }

    #[test]
    fn retryable_classification() {
        assert!(ProviderError::RateLimited { provider: "openai".into() }.is_retryable());
        assert!(
            ProviderError::Overloaded {
                provider: "anthropic".into(),
                status_code: 529
            }
            .is_retryable()
        );
        assert!(
            ProviderError::Api {
                status_code: 502,
                message: "bad gateway".into()
            }
            .is_retryable()
        );
        assert!(
            !ProviderError::Api {
                status_code: 400,
                message: "bad request".into()
            }
            .is_retryable()
        );
        assert!(!ProviderError::InvalidKey { provider: "openai".into() }.is_retryable());
        assert!(!ProviderError::ContextTooLong.is_retryable());
    }

    #[test]
    fn kinds_and_status_codes() {
        let err = ProviderError::ToolCallMalformed {
            status_code: 400,
            failed_generation: None,
        };
        assert_eq!(err.kind(), ProviderErrorKind::ToolCallMalformed);
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(ProviderError::Network("reset".into()).status_code(), None);
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::PermissionDenied {
            tool_name: "delete_path".into(),
            reason: "critical path".into(),
        });
        assert!(err.to_string().contains("delete_path"));
        assert!(err.to_string().contains("critical path"));
    }
}

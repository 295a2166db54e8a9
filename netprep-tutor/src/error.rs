//! Error types for tutor generation
//!
//! This module defines custom error types for the netprep-tutor library,
//! covering configuration, upstream generation, and transport failures.
//!
//! There is deliberately no "malformed output" variant: unparseable model
//! output is handled by [`crate::normalize::normalize`], which always
//! degrades to a usable card instead of failing.

use thiserror::Error;

/// Main error type for tutor operations
#[derive(Error, Debug)]
pub enum TutorError {
    /// Configuration error - missing API key or invalid settings.
    /// Fatal for the whole feature and never retried.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid inbound request (e.g. empty concept)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The upstream model endpoint answered with a non-success status
    #[error("Generation failed with status {status}: {detail}")]
    GenerationFailed { status: u16, detail: String },

    /// Client-side timeout - the in-flight call was aborted
    #[error("Request timed out after {timeout_seconds}s: {context}")]
    TimeoutError {
        timeout_seconds: u64,
        context: String,
    },

    /// Transport error - DNS, TCP, or TLS level failure
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for tutor operations
pub type Result<T> = std::result::Result<T, TutorError>;

impl TutorError {
    /// True when the retry-once policy may reissue the request: the server
    /// failed or the transport dropped. A 4xx means the request itself is
    /// wrong, and a timeout has already cost the caller the full budget.
    pub fn is_retryable(&self) -> bool {
        match self {
            TutorError::GenerationFailed { status, .. } => *status >= 500,
            TutorError::ConnectionError(_) => true,
            _ => false,
        }
    }
}

impl From<String> for TutorError {
    fn from(s: String) -> Self {
        TutorError::Other(s)
    }
}

impl From<&str> for TutorError {
    fn from(s: &str) -> Self {
        TutorError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = TutorError::ConfigError("GEMINI_API_KEY is not set".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: GEMINI_API_KEY is not set"
        );

        let timeout_error = TutorError::TimeoutError {
            timeout_seconds: 20,
            context: "generateContent".to_string(),
        };
        assert!(timeout_error.to_string().contains("timed out after 20s"));

        let gen_error = TutorError::GenerationFailed {
            status: 503,
            detail: "model overloaded".to_string(),
        };
        assert!(gen_error.to_string().contains("status 503"));
        assert!(gen_error.to_string().contains("model overloaded"));
    }

    #[test]
    fn test_error_conversion() {
        let error: TutorError = "test error".into();
        assert!(matches!(error, TutorError::Other(_)));

        let error: TutorError = "test error".to_string().into();
        assert!(matches!(error, TutorError::Other(_)));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(TutorError::GenerationFailed {
            status: 500,
            detail: "internal".into()
        }
        .is_retryable());
        assert!(TutorError::GenerationFailed {
            status: 503,
            detail: "overloaded".into()
        }
        .is_retryable());
        assert!(TutorError::ConnectionError("refused".into()).is_retryable());

        assert!(!TutorError::ConfigError("no key".into()).is_retryable());
        assert!(!TutorError::InvalidRequest("empty concept".into()).is_retryable());
        assert!(!TutorError::GenerationFailed {
            status: 400,
            detail: "bad request".into()
        }
        .is_retryable());
        assert!(!TutorError::GenerationFailed {
            status: 429,
            detail: "quota".into()
        }
        .is_retryable());
        assert!(!TutorError::TimeoutError {
            timeout_seconds: 20,
            context: "call".into()
        }
        .is_retryable());
    }
}

//! LLM error types.

use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed or the server returned an error status.
    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    /// The completion envelope could not be decoded.
    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    /// Request timed out.
    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    /// LLM server is not reachable.
    #[error("LLM provider unavailable: {0}")]
    Unavailable(String),

    /// All retry attempts exhausted.
    #[error("All LLM retry attempts exhausted after {attempts} tries: {source}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        source: Box<LlmError>,
    },

    /// Configuration error.
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Whether the failure was a timeout, looking through retry wrapping.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::RetriesExhausted { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(0)
        } else if err.is_connect() {
            LlmError::Unavailable(err.to_string())
        } else if err.is_decode() {
            LlmError::ParseError(err.to_string())
        } else {
            LlmError::RequestFailed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_seen_through_retry_wrapper() {
        let wrapped = LlmError::RetriesExhausted {
            attempts: 3,
            source: Box::new(LlmError::Timeout(60)),
        };
        assert!(wrapped.is_timeout());
        assert!(!LlmError::Unavailable("down".into()).is_timeout());
        assert!(wrapped.to_string().contains("3 tries"));
    }
}

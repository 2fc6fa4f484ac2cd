//! Error types for the schedule proposer port.

use thiserror::Error;

/// Errors that can occur while obtaining a schedule proposal.
#[derive(Debug, Error, Clone)]
pub enum ProposerError {
    /// Network/HTTP request failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// The request exceeded the configured timeout
    #[error("Proposer request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The model API answered with a non-success status
    #[error("Proposer API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The payload did not parse as the expected list of schedule objects
    #[error("Malformed proposer payload: {message}")]
    MalformedPayload { message: String },

    /// No API key available from config or environment
    #[error("No proposer API key configured")]
    MissingApiKey,

    /// Base URL could not be parsed
    #[error("Invalid proposer base URL: {message}")]
    InvalidBaseUrl { message: String },
}

impl ProposerError {
    /// Returns true if this error is potentially transient and a caller may
    /// choose to retry. The core itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProposerError::Network { .. }
                | ProposerError::Timeout { .. }
                | ProposerError::Api { status: 500..=599, .. }
        )
    }
}

impl From<url::ParseError> for ProposerError {
    fn from(err: url::ParseError) -> Self {
        ProposerError::InvalidBaseUrl {
            message: err.to_string(),
        }
    }
}

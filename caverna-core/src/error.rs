//! Error types for caverna-core

use thiserror::Error;

/// Main error type for the caverna-core library
#[derive(Error, Debug)]
pub enum Error {
    /// No completion credential has been configured
    #[error("completion provider credential is required")]
    MissingCredential,

    /// Provider answered with a non-success status
    #[error("{provider} API error: {status}")]
    Provider { provider: String, status: String },

    /// Transport-level HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with success but the body could not be decoded
    #[error("malformed response from {provider}: {message}")]
    MalformedResponse { provider: String, message: String },

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Narration/playback error
    #[error("narrator error: {0}")]
    Narrator(String),
}

impl Error {
    /// Build a provider error from an HTTP status.
    pub(crate) fn provider(provider: &str, status: reqwest::StatusCode) -> Self {
        let status = match status.canonical_reason() {
            Some(reason) => reason.to_string(),
            None => status.as_u16().to_string(),
        };
        Error::Provider {
            provider: provider.to_string(),
            status,
        }
    }
}

/// Result type alias for caverna-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_uses_status_text() {
        let err = Error::provider("openai", reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "openai API error: Unauthorized");
    }

    #[test]
    fn test_provider_error_without_reason_uses_code() {
        let status = reqwest::StatusCode::from_u16(599).unwrap();
        let err = Error::provider("fish.audio", status);
        assert_eq!(err.to_string(), "fish.audio API error: 599");
    }
}

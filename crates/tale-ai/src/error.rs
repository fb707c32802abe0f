//! Error types for tale-ai

use thiserror::Error;

/// Result type alias using tale-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by prompts and tellers
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error: {message} (type: {error_type})")]
    Api { error_type: String, message: String },

    /// Rate limit exceeded
    #[error("Rate limited: retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// A streamed chunk in a shape the provider should never send
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The prompt plus the expected completion does not fit the model
    #[error("Context too large: {0}")]
    ContextTooLarge(String),

    /// A prompt index outside `[-len, len)`
    #[error("Index {index} out of range for prompt of length {len}")]
    IndexOutOfRange { index: isize, len: usize },

    /// A half-open range whose end precedes its start
    #[error("Invalid range {begin}..{end}")]
    InvalidRange { begin: usize, end: usize },
}

impl Error {
    /// Create an API error from type and message
    pub fn api(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Check if this error is worth retrying against the same request
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Sse(_) => true,
            Error::Api {
                error_type,
                message,
            } => {
                let et = error_type.to_lowercase();
                let msg = message.to_lowercase();
                et.contains("rate_limit")
                    || et.contains("overloaded")
                    || msg.contains("rate limit")
                    || msg.contains("overloaded")
                    || msg.contains("too many requests")
            }
            _ => false,
        }
    }

    /// Check if this error means the prompt must shrink before trying again
    pub fn is_context_overflow(&self) -> bool {
        match self {
            Error::ContextTooLarge(_) => true,
            Error::Api { message, .. } => crate::overflow::is_context_overflow(message),
            _ => false,
        }
    }
}

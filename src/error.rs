//! Error types for project-agent

use thiserror::Error;

/// Result type alias using project-agent's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Failure to decode a queue request envelope
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Message bytes are not UTF-8 text
    #[error("message body is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Message text is not a JSON object
    #[error("message body is not a valid JSON object: {0}")]
    InvalidJson(String),

    /// A required key is absent or has the wrong type
    #[error("message body does not match the envelope: {0}")]
    Schema(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            serde_json::error::Category::Data => DecodeError::Schema(err.to_string()),
            _ => DecodeError::InvalidJson(err.to_string()),
        }
    }
}

/// Main error type for project-agent
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed queue request envelope
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Invalid input (missing HTTP field, bad arguments)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The agent run reached the failed terminal state
    #[error("Agent run {run_id} failed: {message}")]
    UpstreamRun {
        /// Run identifier
        run_id: String,
        /// Error reported by the agent service
        message: String,
    },

    /// Agent service API error
    #[error("Agent service error: {0}")]
    AgentService(String),

    /// Queue transport error
    #[error("Queue error: {0}")]
    Queue(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unauthorized access
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Operation cancelled before completion
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Queue(_) | Error::RateLimit(_) | Error::Timeout(_)
        )
    }

    /// Check if error is a client error (user's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::Decode(_) | Error::NotFound(_) | Error::Unauthorized(_)
        )
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Config(format!("Invalid URL: {}", err))
    }
}

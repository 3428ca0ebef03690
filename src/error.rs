//! Error types for chat-stream

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`ChatStreamError`]
pub type Result<T> = std::result::Result<T, ChatStreamError>;

/// Main error type for chat-stream
///
/// Malformed payloads and unrecognized frames never show up here: they are
/// absorbed by the parser and adapters. These variants cover transport,
/// configuration and caller errors.
#[derive(Debug, Error)]
pub enum ChatStreamError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parse error
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response status, with the full error body
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response carried no body to stream
    #[error("Response body is missing")]
    MissingBody,

    /// A single unterminated line grew past the configured ceiling
    #[error("Stream line exceeded {limit} bytes")]
    LineTooLong { limit: usize },

    /// Transport failure that is not a reqwest error
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// No API key configured for a provider
    #[error("Missing API key for provider: {provider}")]
    MissingApiKey { provider: String },

    /// Header name or value rejected by the HTTP layer
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A new turn was started while another is still streaming
    #[error("A turn is already in progress")]
    TurnInProgress,

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl From<String> for ChatStreamError {
    fn from(s: String) -> Self {
        ChatStreamError::Other(s)
    }
}

impl From<&str> for ChatStreamError {
    fn from(s: &str) -> Self {
        ChatStreamError::Other(s.to_string())
    }
}

// SPDX-License-Identifier: MIT

//! Typed error handling for ollama-bridge
//!
//! Every fallible operation of the adapter returns [`AdapterError`].
//! Malformed NDJSON lines are the one failure that never reaches this type:
//! the streaming decoder logs and skips them.

use thiserror::Error;

/// Top-level error type for the content generation adapter
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Invalid adapter configuration (auth mode mismatch, bad base URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-2xx response from the provider
    #[error("Ollama API error: {status} {status_text} - {body}")]
    Status {
        status: u16,
        status_text: String,
        body: String,
    },

    /// Non-streaming response that carried nothing to return
    #[error("Empty response from Ollama: {0}")]
    EmptyResponse(String),

    /// Streaming response without a readable body
    #[error("Response body is missing or unreadable")]
    MissingBody,

    /// Stream ended before the provider sent its terminal record
    #[error("Stream ended before the terminal record (done=true) was received")]
    StreamTruncated,

    /// HTTP transport errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl AdapterError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a status error from a non-2xx response
    pub fn status(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        Self::Status {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: body.into(),
        }
    }

    /// True for errors raised by the transport or the provider's HTTP status
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;

//! Error types for the redemption-code client.
//!
//! # Design
//! Only local failures live here: the HTTP exchange could not complete, the
//! client was misconfigured, or a request body could not be written. Every
//! failure the remote service reports (a 403, an embedded `error-code`, ...)
//! is returned as data inside `ApiResponse`, never as an `ApiError`.

use thiserror::Error;

/// Errors returned by `CodesClient` and `Transport` implementations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP exchange itself failed (DNS, connect, TLS, I/O).
    #[error("transport failed for {url}: {message}")]
    Transport { url: String, message: String },

    /// The configured base URL is not an absolute http(s) URL.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The API key was empty.
    #[error("API key is missing")]
    MissingApiKey,

    /// The request body could not be written.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    pub fn transport(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

//! Error types for the proxy and its capture pipeline.

use thiserror::Error;

/// Top-level error type.
///
/// Capture-path failures are caught at the boundary of the detached task
/// that produced them and logged; only forward-path errors may shape the
/// client-visible response.
#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    /// Failure talking to the upstream endpoint.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Malformed JSON where a document was required.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failure while reading a response byte stream.
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Failure in the audit store.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Invalid runtime configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<rusqlite::Error> for ProxyError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}

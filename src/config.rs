//! Runtime configuration.
//!
//! All settings come from the environment with sensible defaults, so the
//! binary can run with no flags in front of any OpenAI-compatible upstream.

use std::net::SocketAddr;

use crate::error::ProxyError;

/// The single route the proxy serves and forwards.
pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Proxy runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the proxy listens on.
    pub listen_addr: SocketAddr,
    /// Base URL of the upstream API (scheme + host, no path).
    pub upstream_url: String,
    /// Path of the SQLite audit database.
    pub db_path: String,
}

impl Config {
    /// Build a configuration from `CHATTAP_*` environment variables.
    pub fn from_env() -> Result<Self, ProxyError> {
        let listen_addr = std::env::var("CHATTAP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8787".to_string())
            .parse()
            .map_err(|e| ProxyError::ConfigError(format!("invalid CHATTAP_LISTEN_ADDR: {e}")))?;

        let upstream_url = std::env::var("CHATTAP_UPSTREAM_URL")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());

        let db_path = std::env::var("CHATTAP_DB_PATH").unwrap_or_else(|_| "chattap.db".to_string());

        Ok(Self {
            listen_addr,
            upstream_url,
            db_path,
        })
    }

    /// Full upstream URL of the chat completions endpoint.
    pub fn upstream_endpoint(&self) -> String {
        format!(
            "{}{}",
            self.upstream_url.trim_end_matches('/'),
            CHAT_COMPLETIONS_PATH
        )
    }
}

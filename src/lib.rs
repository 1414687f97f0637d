//! chattap
//!
//! Transparent audit-logging proxy for OpenAI-compatible chat completion
//! APIs. Requests to `/v1/chat/completions` are forwarded verbatim to a
//! configured upstream and the response is returned untouched - streaming
//! or not - while a detached capture task reconstructs the conversation
//! (system/developer prompt, user prompt, assistant reply) and writes it
//! to an audit store. Capture failures never reach the client.
#![deny(unsafe_code)]

pub mod capture;
pub mod config;
pub mod error;
pub mod prompt;
pub mod proxy;
pub mod storage;
pub mod types;

pub use error::ProxyError;

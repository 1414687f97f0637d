//! Wire types for the OpenAI-compatible chat completion protocol.

mod chat;

pub use chat::*;

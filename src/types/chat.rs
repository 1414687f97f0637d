//! Chat completion wire shapes.
//!
//! These types are intentionally lenient: the proxy forwards the raw body
//! bytes untouched and only parses a copy for audit capture, so unknown
//! fields, missing keys, and odd content shapes must never fail
//! deserialization.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Message content - a string, an ordered list of typed parts, or a single
/// structured part.
///
/// The union is total over JSON: anything that is none of the recognized
/// shapes lands in `Other` and resolves to empty text.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text
    Text(String),
    /// Multimodal parts; only `{"type": "text"}` parts carry text
    Parts(Vec<Value>),
    /// A single structured part with a `text` field
    Part(Map<String, Value>),
    /// Anything else (null, numbers, ...)
    Other(Value),
}

impl MessageContent {
    /// Extract all plain text from the content.
    ///
    /// Text parts of a multimodal list are joined with a newline; parts of
    /// any other shape are skipped. This is the single resolution point for
    /// content wherever it appears (request messages, response messages,
    /// streaming deltas).
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(part_text)
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Part(part) => part
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Self::Other(_) => String::new(),
        }
    }
}

/// Text of a single multimodal part, if it is a well-formed text part.
fn part_text(part: &Value) -> Option<&str> {
    let part = part.as_object()?;
    if part.get("type")?.as_str()? != "text" {
        return None;
    }
    part.get("text")?.as_str()
}

/// One role-tagged message from the request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub role: Option<String>,
    pub content: Option<MessageContent>,
}

/// The slice of the request body the proxy inspects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: Option<String>,
    pub messages: Option<Vec<ChatMessage>>,
    #[serde(default)]
    pub stream: bool,
}

/// A complete (non-streaming) response document.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ResponseChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseChoice {
    pub index: Option<u32>,
    pub message: Option<ResponseMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<MessageContent>,
}

/// One chunk of a streaming response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    pub index: Option<u32>,
    pub delta: Option<ChunkDelta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkDelta {
    pub content: Option<MessageContent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content(value: Value) -> MessageContent {
        serde_json::from_value(value).expect("MessageContent is total over JSON")
    }

    #[test]
    fn string_content_returns_unchanged() {
        assert_eq!(content(json!("hello")).text(), "hello");
    }

    #[test]
    fn text_parts_join_with_newline() {
        let value = json!([
            {"type": "text", "text": "first"},
            {"type": "text", "text": "second"},
        ]);
        assert_eq!(content(value).text(), "first\nsecond");
    }

    #[test]
    fn non_text_parts_are_skipped() {
        let value = json!([
            {"type": "text", "text": "kept"},
            {"type": "image_url", "image_url": {"url": "https://example.com/a.png"}},
            {"type": "text"},
            "not an object",
            {"type": "text", "text": 42},
        ]);
        assert_eq!(content(value).text(), "kept");
    }

    #[test]
    fn single_part_object_returns_text_field() {
        assert_eq!(content(json!({"text": "x"})).text(), "x");
        assert_eq!(content(json!({"type": "text"})).text(), "");
    }

    #[test]
    fn other_shapes_resolve_to_empty() {
        assert_eq!(content(json!(null)).text(), "");
        assert_eq!(content(json!(42)).text(), "");
        assert_eq!(content(json!(true)).text(), "");
    }

    #[test]
    fn request_parse_is_lenient() {
        let request: ChatCompletionRequest = serde_json::from_value(json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "user", "content": "hi"},
                {"role": "tool", "content": 7},
                {"content": "no role"},
            ],
            "stream": true,
            "temperature": 0.2,
        }))
        .unwrap();
        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert!(request.stream);
        assert_eq!(request.messages.unwrap().len(), 3);
    }
}

//! Prompt assembly: folds request messages into the audit buckets.

use crate::types::ChatMessage;

/// Assembled prompt text, bucketed by author.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptText {
    /// Text of `system` and `developer` messages.
    pub system: String,
    /// Text of `user` messages.
    pub user: String,
}

/// Walk the request messages in order and collect prompt text.
///
/// Messages with other roles (assistant history, tool results) are not
/// recorded as prompts. Duplicate roles concatenate; entries within a
/// bucket are separated by a blank line.
pub fn assemble_prompts(messages: Option<&[ChatMessage]>) -> PromptText {
    let mut system = Vec::new();
    let mut user = Vec::new();

    for message in messages.unwrap_or_default() {
        let text = message
            .content
            .as_ref()
            .map(|content| content.text())
            .unwrap_or_default();
        if text.is_empty() {
            continue;
        }
        match message.role.as_deref() {
            Some("system") | Some("developer") => system.push(text),
            Some("user") => user.push(text),
            _ => {}
        }
    }

    PromptText {
        system: system.join("\n\n").trim().to_string(),
        user: user.join("\n\n").trim().to_string(),
    }
}

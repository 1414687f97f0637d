//! Per-choice text accumulation and transcript rendering.

use std::collections::BTreeMap;

/// Accumulates incremental text fragments keyed by choice index.
///
/// Fragments for the same index concatenate in arrival order; different
/// indices may interleave freely, as they do in multi-choice streams.
#[derive(Debug, Clone, Default)]
pub struct ChoiceAccumulator {
    choices: BTreeMap<u32, String>,
}

impl ChoiceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text fragment to the given choice index.
    pub fn push(&mut self, index: u32, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.choices.entry(index).or_default().push_str(fragment);
    }

    /// Render the merged transcript.
    ///
    /// Indices render in ascending numeric order regardless of arrival
    /// order. A single non-empty choice renders as its text alone; two or
    /// more render as labelled blocks separated by a blank line.
    pub fn transcript(&self) -> String {
        let parts: Vec<(u32, &str)> = self
            .choices
            .iter()
            .filter(|(_, text)| !text.is_empty())
            .map(|(index, text)| (*index, text.as_str()))
            .collect();

        let merged = match parts.as_slice() {
            [] => String::new(),
            [(_, text)] => (*text).to_string(),
            many => many
                .iter()
                .map(|(index, text)| format!("--- choice {index} ---\n{text}"))
                .collect::<Vec<_>>()
                .join("\n\n"),
        };

        merged.trim().to_string()
    }
}

//! Response capture engine.
//!
//! Reconstructs the assistant's reply from a duplicated response body and
//! hands it to the audit store, without ever touching the copy the client
//! reads. All work here runs in detached tasks whose failures are caught
//! at the task boundary and logged.

pub mod merge;
pub mod sse;
pub mod tee;

pub use merge::ChoiceAccumulator;
pub use sse::{SseCapture, capture_sse_transcript};
pub use tee::{ByteStream, tee};

use std::sync::Arc;

use bytes::Bytes;
use futures_util::Stream;

use crate::error::ProxyError;
use crate::storage::RecordStore;
use crate::types::ChatCompletionResponse;

/// Spawn the detached task that reconstructs a streamed reply and persists
/// it under `record_id`.
pub fn spawn_stream_capture<S, B, E>(store: Arc<dyn RecordStore>, record_id: String, stream: S)
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + 'static,
    E: std::fmt::Display + 'static,
{
    tokio::spawn(async move {
        let transcript = capture_sse_transcript(stream).await;
        persist_output(store, &record_id, &transcript).await;
    });
}

/// Spawn the detached task that extracts the reply from a buffered
/// non-streaming response body.
pub fn spawn_json_capture(store: Arc<dyn RecordStore>, record_id: String, body: Bytes) {
    tokio::spawn(async move {
        match extract_json_transcript(&body) {
            Ok(transcript) => persist_output(store, &record_id, &transcript).await,
            Err(err) => {
                tracing::warn!(record_id = %record_id, "failed to parse response for capture: {err}");
            }
        }
    });
}

/// Merge the choices of a single complete response document.
pub fn extract_json_transcript(body: &[u8]) -> Result<String, ProxyError> {
    let response: ChatCompletionResponse = serde_json::from_slice(body)?;
    let mut choices = ChoiceAccumulator::new();
    for choice in &response.choices {
        let text = choice
            .message
            .as_ref()
            .and_then(|message| message.content.as_ref())
            .map(|content| content.text())
            .unwrap_or_default();
        choices.push(choice.index.unwrap_or(0), &text);
    }
    Ok(choices.transcript())
}

async fn persist_output(store: Arc<dyn RecordStore>, record_id: &str, transcript: &str) {
    if let Err(err) = store.update_output(record_id, transcript).await {
        tracing::warn!(record_id = %record_id, "failed to persist assistant output: {err}");
    }
}

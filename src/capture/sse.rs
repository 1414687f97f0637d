//! Incremental event-stream parsing for the capture path.
//!
//! The upstream delivers `data: <json>` events separated by blank lines,
//! in arbitrary chunk sizes: a chunk may end in the middle of an event,
//! in the middle of a record delimiter, or in the middle of a multi-byte
//! UTF-8 sequence. The parser buffers across reads and reconstructs the
//! assistant transcript as events complete.

use futures_util::{Stream, StreamExt};

use super::merge::ChoiceAccumulator;
use crate::types::ChatCompletionChunk;

/// Payload that marks normal end of a streaming response.
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental SSE parser feeding a [`ChoiceAccumulator`].
#[derive(Debug, Default)]
pub struct SseCapture {
    /// Undecoded tail of a multi-byte sequence from the previous chunk.
    pending: Vec<u8>,
    buffer: String,
    choices: ChoiceAccumulator,
    done: bool,
}

impl SseCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes.
    ///
    /// Returns `true` once the `[DONE]` sentinel has been seen; the caller
    /// should stop reading and drop its stream copy.
    pub fn feed(&mut self, chunk: &[u8]) -> bool {
        if self.done {
            return true;
        }
        self.decode(chunk);

        while let Some((end, delimiter)) = find_boundary(&self.buffer) {
            let event = self.buffer[..end].to_string();
            self.buffer.drain(..end + delimiter);
            if self.handle_event(&event) {
                self.done = true;
                return true;
            }
        }
        false
    }

    /// Drain the decoder state and render the final transcript.
    ///
    /// A partial trailing event or multi-byte sequence cannot contribute
    /// text and is discarded.
    pub fn finish(mut self) -> String {
        self.pending.clear();
        self.choices.transcript()
    }

    /// Decode a chunk, carrying a partial multi-byte sequence across calls.
    fn decode(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        // Incomplete sequence at the end of input: hold it
                        // back for the next chunk.
                        None => {
                            self.pending = tail.to_vec();
                            break;
                        }
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                    }
                }
            }
        }
    }

    /// Process one complete event; returns `true` on the sentinel.
    fn handle_event(&mut self, event: &str) -> bool {
        let payload = event_payload(event);
        if payload.is_empty() {
            return false;
        }
        if payload == DONE_SENTINEL {
            return true;
        }

        let chunk: ChatCompletionChunk = match serde_json::from_str(&payload) {
            Ok(chunk) => chunk,
            Err(err) => {
                tracing::debug!("skipping unparsable stream event: {err}");
                return false;
            }
        };

        for choice in &chunk.choices {
            let text = choice
                .delta
                .as_ref()
                .and_then(|delta| delta.content.as_ref())
                .map(|content| content.text())
                .unwrap_or_default();
            self.choices.push(choice.index.unwrap_or(0), &text);
        }
        false
    }
}

/// Find the earliest record boundary, returning its byte offset and length.
///
/// Both `\n\n` and `\r\n\r\n` delimit events.
fn find_boundary(buffer: &str) -> Option<(usize, usize)> {
    let lf = buffer.find("\n\n").map(|at| (at, 2));
    let crlf = buffer.find("\r\n\r\n").map(|at| (at, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Extract the `data:` payload of one raw event.
///
/// Non-`data:` lines are dropped, the field prefix and one optional space
/// are stripped, empty results are discarded, and the remaining lines are
/// joined with newlines.
fn event_payload(event: &str) -> String {
    event
        .lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .filter(|rest| !rest.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Consume a response byte stream and reconstruct the assistant transcript.
///
/// Returns whatever has been merged when the `[DONE]` sentinel arrives or
/// the stream ends, whichever comes first. On the sentinel the remaining
/// stream is dropped so the underlying read is cancelled promptly; a read
/// error ends capture with the partial transcript rather than failing.
pub async fn capture_sse_transcript<S, B, E>(stream: S) -> String
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut capture = SseCapture::new();
    let mut stream = std::pin::pin!(stream);

    while let Some(next) = stream.next().await {
        match next {
            Ok(chunk) => {
                if capture.feed(chunk.as_ref()) {
                    break;
                }
            }
            Err(err) => {
                tracing::debug!("capture stream ended early: {err}");
                break;
            }
        }
    }

    capture.finish()
}

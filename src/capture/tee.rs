//! Response stream duplication.
//!
//! Splits one response byte stream into two independent readable copies:
//! the client copy and the capture copy. Each copy has its own buffered
//! cursor and can be consumed at its own pace; the upstream is read
//! exactly once by a single pump task.

use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::error::ProxyError;

/// A boxed byte stream, as produced by [`tee`].
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ProxyError>> + Send>>;

/// Duplicate a byte stream into two independent copies.
///
/// Chunks are pushed to both receivers as they arrive; a dropped receiver
/// stops receiving without affecting the other. The pump ends when the
/// source does, or early once both receivers are gone.
pub fn tee<S, E>(source: S) -> (ByteStream, ByteStream)
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let (primary_tx, primary_rx) = mpsc::unbounded_channel();
    let (capture_tx, capture_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut source = std::pin::pin!(source);
        while let Some(next) = source.next().await {
            let item = next.map_err(|err| ProxyError::StreamError(err.to_string()));
            let primary_alive = primary_tx.send(item.clone()).is_ok();
            let capture_alive = capture_tx.send(item).is_ok();
            if !primary_alive && !capture_alive {
                break;
            }
        }
    });

    (receiver_stream(primary_rx), receiver_stream(capture_rx))
}

fn receiver_stream(mut rx: mpsc::UnboundedReceiver<Result<Bytes, ProxyError>>) -> ByteStream {
    Box::pin(async_stream::stream! {
        while let Some(item) = rx.recv().await {
            yield item;
        }
    })
}

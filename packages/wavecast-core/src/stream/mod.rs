//! Byte stream plumbing for the proxy path.
//!
//! The proxy must observe the first transport chunk (for MIME sniffing)
//! without losing it: the outbound body replays the retained prefix and then
//! relays the remainder of the live upstream stream, one chunk in memory at
//! a time. Radio streams are unbounded in duration, so nothing here ever
//! buffers beyond the chunk currently in flight.

pub mod icy;

pub use icy::{extract_stream_title, read_first_title, IcyHeaders, IcyMetadataBlock};

use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};

/// Boxed outbound byte stream handed to the HTTP response body.
pub type RelayStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Pulls the first chunk from an upstream body.
///
/// A stream that ends immediately yields an empty chunk rather than an
/// error; the sniffer treats short chunks as "no result" anyway.
pub async fn read_first_chunk<S, E>(body: &mut S) -> Result<Bytes, E>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    match body.next().await {
        Some(Ok(chunk)) => Ok(chunk),
        Some(Err(e)) => Err(e),
        None => Ok(Bytes::new()),
    }
}

/// Re-assembles a partially consumed upstream body into an outbound stream.
///
/// Emits the retained first chunk (skipped when empty), then relays
/// subsequent upstream chunks in order until the upstream completes. The
/// concatenation of emitted chunks equals the original upstream byte
/// sequence: nothing is dropped or duplicated on the forwarding path.
///
/// Mid-stream upstream read failures surface as an `io::Error` item so the
/// client sees an aborted transfer instead of a clean-looking truncation.
/// Dropping the returned stream (client disconnect) drops the upstream body
/// with it, releasing the underlying connection.
pub fn replay_with_prefix<S, E>(
    first_chunk: Bytes,
    rest: S,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        if !first_chunk.is_empty() {
            yield Ok(first_chunk);
        }

        futures::pin_mut!(rest);
        while let Some(item) = rest.next().await {
            match item {
                Ok(chunk) => yield Ok(chunk),
                Err(e) => {
                    log::warn!("[Stream] Upstream read failed mid-stream: {}", e);
                    yield Err(std::io::Error::other(e.to_string()));
                    return;
                }
            }
        }
    }
}

//! ICY (Shoutcast) protocol metadata extraction.
//!
//! Icecast/Shoutcast servers interleave periodic text metadata into the audio
//! byte stream when the client negotiates with `Icy-MetaData: 1`. The layout,
//! announced by the `icy-metaint` response header, is:
//!
//! ```text
//! <metaint audio bytes> <len byte> <len * 16 metadata bytes> <metaint audio bytes> ...
//! ```
//!
//! The metadata resolver only needs the first block: skip the audio run,
//! read the length indicator, collect the block, pull `StreamTitle` out of
//! it. Audio bytes are discarded by design — nothing is relayed to a caller
//! of /icy.

use bytes::{Bytes, BytesMut};
use futures::stream::{Stream, StreamExt};
use reqwest::header::HeaderMap;

use crate::protocol_constants::ICY_BLOCK_UNIT;

/// ICY description fields parsed from upstream response headers.
#[derive(Debug, Clone, Default)]
pub struct IcyHeaders {
    /// Upstream-declared content type, empty when absent.
    pub content_type: String,
    /// Station name (`icy-name`), empty when absent.
    pub name: String,
    /// Bitrate label: `icy-br`, falling back to `ice-audio-info` for
    /// Icecast servers that only send the latter. Empty when neither is set.
    pub bitrate_label: String,
    /// Metadata interval in bytes; 0 means no interleaved metadata.
    pub metaint: usize,
    /// Numeric bitrate in kbps parsed from `icy-br`, 0 when absent/garbled.
    pub bitrate: u32,
}

impl IcyHeaders {
    /// Parses the ICY fields out of an upstream response header map.
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        let icy_br = header_str(headers, "icy-br");

        Self {
            content_type: header_str(headers, "content-type").unwrap_or_default(),
            name: header_str(headers, "icy-name").unwrap_or_default(),
            bitrate_label: icy_br
                .clone()
                .or_else(|| header_str(headers, "ice-audio-info"))
                .unwrap_or_default(),
            metaint: header_str(headers, "icy-metaint")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
            bitrate: icy_br.and_then(|v| v.trim().parse().ok()).unwrap_or(0),
        }
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// One parsed metadata block.
///
/// Built once per /icy invocation and discarded after the JSON response is
/// constructed — no caching, no persistence.
#[derive(Debug, Clone, Default)]
pub struct IcyMetadataBlock {
    /// The `StreamTitle` value, trimmed; empty when the block had none.
    pub title: String,
    /// The raw bracketed `key='value';` text of the block.
    pub raw: String,
}

/// Reads the first metadata block out of a negotiated ICY stream.
///
/// Consumes `metaint` bytes of audio (discarded), then one length-indicator
/// byte, then `len * 16` metadata bytes, accumulating across however many
/// partial reads the transport delivers. A length indicator of zero yields
/// an empty title without touching the block phase.
///
/// Skip-phase alignment is deliberately permissive: when a read overshoots
/// the remaining audio count, the excess bytes of that read are dropped and
/// the next read's first byte is taken as the length indicator. Upstream
/// servers flush metadata on a packet boundary in practice, and the
/// imprecision only ever costs us this one probe — the connection is
/// discarded afterwards either way.
///
/// Stream end (or a read error) before a phase completes degrades to
/// parsing whatever was collected, possibly an empty title. Never an error.
pub async fn read_first_title<S, E>(mut body: S, metaint: usize) -> IcyMetadataBlock
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    // Phase 1: skip the audio run
    let mut to_skip = metaint;
    while to_skip > 0 {
        match body.next().await {
            Some(Ok(chunk)) => {
                if chunk.len() <= to_skip {
                    to_skip -= chunk.len();
                } else {
                    // Overshoot: drop the remainder of this read
                    to_skip = 0;
                }
            }
            Some(Err(e)) => {
                log::debug!("[Icy] Read failed while skipping audio: {}", e);
                return IcyMetadataBlock::default();
            }
            None => return IcyMetadataBlock::default(),
        }
    }

    // Phase 2: length indicator is the first byte of the next non-empty
    // read; the rest of that read feeds the block phase.
    let (len_byte, mut pending) = loop {
        match body.next().await {
            Some(Ok(chunk)) if !chunk.is_empty() => break (chunk[0], chunk.slice(1..)),
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                log::debug!("[Icy] Read failed before length indicator: {}", e);
                return IcyMetadataBlock::default();
            }
            None => return IcyMetadataBlock::default(),
        }
    };

    let block_len = len_byte as usize * ICY_BLOCK_UNIT;
    if block_len == 0 {
        return IcyMetadataBlock::default();
    }

    // Phase 3: accumulate exactly block_len bytes (max 255 * 16 = 4080)
    let mut collected = BytesMut::with_capacity(block_len);
    loop {
        let need = block_len - collected.len();
        if need == 0 {
            break;
        }

        if !pending.is_empty() {
            let take = need.min(pending.len());
            collected.extend_from_slice(&pending[..take]);
            pending = pending.slice(take..);
            continue;
        }

        match body.next().await {
            Some(Ok(chunk)) => pending = chunk,
            Some(Err(e)) => {
                log::debug!("[Icy] Short metadata block ({} of {} bytes): {}", collected.len(), block_len, e);
                break;
            }
            None => break,
        }
    }

    let raw = String::from_utf8_lossy(&collected)
        .trim_end_matches('\0')
        .to_string();
    let title = extract_stream_title(&raw).unwrap_or_default();

    IcyMetadataBlock { title, raw }
}

/// Extracts the first `StreamTitle='...'` value from raw metadata text.
///
/// Key match is case-insensitive, the value is single-quote delimited and
/// returned trimmed. `None` when the key is missing or the quote is never
/// closed (truncated block).
pub fn extract_stream_title(raw: &str) -> Option<String> {
    const KEY: &str = "streamtitle='";

    // ASCII lowercasing preserves byte offsets, so indices found in the
    // lowered copy are valid in the original.
    let lowered = raw.to_ascii_lowercase();
    let start = lowered.find(KEY)? + KEY.len();
    let value = &raw[start..];
    let end = value.find('\'')?;

    Some(value[..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn body(parts: Vec<Vec<u8>>) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Unpin {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from(p))))
    }

    /// A 32-byte block: `StreamTitle='Artist - Song';StreamUrl='';` is 44
    /// bytes, too long for two units, so tests use a shorter canonical one.
    fn block_bytes(text: &str, units: usize) -> Vec<u8> {
        let mut block = text.as_bytes().to_vec();
        assert!(block.len() <= units * ICY_BLOCK_UNIT);
        block.resize(units * ICY_BLOCK_UNIT, 0);
        block
    }

    mod title_extraction {
        use super::*;

        #[test]
        fn extracts_and_trims_value() {
            assert_eq!(
                extract_stream_title("StreamTitle=' Artist - Song ';StreamUrl='';").as_deref(),
                Some("Artist - Song")
            );
        }

        #[test]
        fn key_is_case_insensitive() {
            assert_eq!(
                extract_stream_title("streamtitle='x';").as_deref(),
                Some("x")
            );
            assert_eq!(
                extract_stream_title("STREAMTITLE='x';").as_deref(),
                Some("x")
            );
        }

        #[test]
        fn empty_value_is_empty_string() {
            assert_eq!(extract_stream_title("StreamTitle='';").as_deref(), Some(""));
        }

        #[test]
        fn missing_key_or_unclosed_quote_is_none() {
            assert_eq!(extract_stream_title("StreamUrl='http://x';"), None);
            assert_eq!(extract_stream_title("StreamTitle='cut off"), None);
            assert_eq!(extract_stream_title(""), None);
        }

        #[test]
        fn non_ascii_titles_survive() {
            assert_eq!(
                extract_stream_title("StreamTitle='Björk - Jóga';").as_deref(),
                Some("Björk - Jóga")
            );
        }
    }

    mod header_parsing {
        use super::*;
        use reqwest::header::{HeaderName, HeaderValue};

        fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
            let mut map = HeaderMap::new();
            for (name, value) in pairs {
                map.append(
                    HeaderName::from_bytes(name.as_bytes()).unwrap(),
                    HeaderValue::from_str(value).unwrap(),
                );
            }
            map
        }

        #[test]
        fn parses_all_fields() {
            let parsed = IcyHeaders::from_header_map(&headers(&[
                ("content-type", "audio/mpeg"),
                ("icy-name", "Test FM"),
                ("icy-br", "128"),
                ("icy-metaint", "8192"),
            ]));

            assert_eq!(parsed.content_type, "audio/mpeg");
            assert_eq!(parsed.name, "Test FM");
            assert_eq!(parsed.bitrate_label, "128");
            assert_eq!(parsed.metaint, 8192);
            assert_eq!(parsed.bitrate, 128);
        }

        #[test]
        fn ice_audio_info_fallback_for_label_only() {
            let parsed = IcyHeaders::from_header_map(&headers(&[(
                "ice-audio-info",
                "bitrate=128;samplerate=44100",
            )]));

            assert_eq!(parsed.bitrate_label, "bitrate=128;samplerate=44100");
            // Numeric bitrate comes only from icy-br
            assert_eq!(parsed.bitrate, 0);
        }

        #[test]
        fn absent_headers_default_to_empty() {
            let parsed = IcyHeaders::from_header_map(&HeaderMap::new());
            assert_eq!(parsed.metaint, 0);
            assert_eq!(parsed.bitrate, 0);
            assert!(parsed.name.is_empty());
        }

        #[test]
        fn garbled_numbers_default_to_zero() {
            let parsed = IcyHeaders::from_header_map(&headers(&[
                ("icy-br", "fast"),
                ("icy-metaint", "-1"),
            ]));
            assert_eq!(parsed.bitrate, 0);
            assert_eq!(parsed.metaint, 0);
        }
    }

    mod block_parsing {
        use super::*;

        #[tokio::test]
        async fn parses_title_after_metaint_skip() {
            let metaint = 8192;
            let mut frame = vec![2u8]; // 2 * 16 = 32 byte block
            frame.extend(block_bytes("StreamTitle='Artist - Song';", 2));

            let parsed =
                read_first_title(body(vec![vec![0u8; metaint], frame]), metaint).await;

            assert_eq!(parsed.title, "Artist - Song");
            assert!(parsed.raw.starts_with("StreamTitle="));
        }

        #[tokio::test]
        async fn accumulates_across_small_reads() {
            let metaint = 100;
            let block = block_bytes("StreamTitle='Split';", 2);

            // Audio split unevenly, length byte alone, block dribbled in
            let mut parts = vec![vec![0u8; 33], vec![0u8; 33], vec![0u8; 34], vec![2u8]];
            parts.extend(block.chunks(5).map(|c| c.to_vec()));

            let parsed = read_first_title(body(parts), metaint).await;
            assert_eq!(parsed.title, "Split");
        }

        #[tokio::test]
        async fn zero_length_indicator_means_empty_title() {
            let metaint = 64;
            // Stream ends right after the zero byte; no block phase runs
            let parsed = read_first_title(body(vec![vec![0u8; 64], vec![0u8]]), metaint).await;
            assert_eq!(parsed.title, "");
            assert_eq!(parsed.raw, "");
        }

        #[tokio::test]
        async fn block_following_length_byte_in_same_read() {
            let metaint = 16;
            let mut frame = vec![0u8; 16]; // audio, exactly one read
            frame.push(1); // 16-byte block
            frame.extend(block_bytes("StreamTitle='x';", 1));

            let parsed = read_first_title(body(vec![vec![0u8; 16], frame[16..].to_vec()]), metaint).await;
            assert_eq!(parsed.title, "x");
        }

        #[tokio::test]
        async fn overshooting_skip_read_drops_its_remainder() {
            let metaint = 10;
            // First read carries 14 bytes: 10 audio + 4 junk. The junk is
            // dropped, and the next read starts with the length byte.
            let mut second = vec![1u8];
            second.extend(block_bytes("StreamTitle='ok';", 1));

            let parsed = read_first_title(body(vec![vec![0u8; 14], second]), metaint).await;
            assert_eq!(parsed.title, "ok");
        }

        #[tokio::test]
        async fn stream_end_during_skip_degrades_to_empty() {
            let parsed = read_first_title(body(vec![vec![0u8; 100]]), 8192).await;
            assert_eq!(parsed.title, "");
        }

        #[tokio::test]
        async fn short_block_without_closing_quote_degrades_to_empty_title() {
            let metaint = 8;
            // Announces a 32-byte block but only 10 bytes arrive
            let parsed = read_first_title(
                body(vec![vec![0u8; 8], vec![2u8], b"StreamTitl".to_vec()]),
                metaint,
            )
            .await;

            assert_eq!(parsed.title, "");
            assert_eq!(parsed.raw, "StreamTitl");
        }

        #[tokio::test]
        async fn read_error_during_skip_degrades_to_empty() {
            let parts: Vec<Result<Bytes, std::io::Error>> = vec![
                Ok(Bytes::from(vec![0u8; 10])),
                Err(std::io::Error::other("reset")),
            ];
            let parsed = read_first_title(stream::iter(parts), 8192).await;
            assert_eq!(parsed.title, "");
        }
    }
}

//! Media type sniffing from leading stream bytes.
//!
//! Shoutcast/Icecast servers routinely declare types browsers refuse to play
//! (`audio/aacp`, `text/plain`, even `text/html`). Rather than trusting the
//! label, the proxy inspects the first transport chunk for well-known magic
//! bytes and textual playlist markers, and only then decides whether to
//! override the declared Content-Type.

use crate::protocol_constants::{SNIFF_MIN_BYTES, SNIFF_TEXT_WINDOW};

/// Declared content-types known to break in-browser audio playback.
///
/// When the sniffer has a result and the upstream declared one of these (or
/// nothing at all), the sniffed type wins. A plausible declared audio type
/// is never overridden.
const UNRELIABLE_CONTENT_TYPES: &[&str] = &[
    "audio/aacp",
    "text/plain",
    "text/html",
    "application/json",
    "application/octet-stream",
];

/// Sniffs a media type from the first chunk of a byte stream.
///
/// Requires at least four bytes (the longest binary signature); shorter
/// chunks yield `None` and the caller keeps the upstream-declared type.
/// The chunk is inspected as delivered by the transport — there is no
/// re-buffering to accumulate a minimum window.
///
/// Deterministic, no I/O, no side effects.
pub fn sniff_mime(first_chunk: &[u8]) -> Option<&'static str> {
    if first_chunk.len() < SNIFF_MIN_BYTES {
        return None;
    }

    // Text markers (playlist formats served as a raw body)
    let window = &first_chunk[..first_chunk.len().min(SNIFF_TEXT_WINDOW)];
    let head = String::from_utf8_lossy(window);
    if head.starts_with("#EXTM3U") {
        return Some("application/vnd.apple.mpegurl");
    }
    if head.starts_with("[playlist]") {
        return Some("audio/x-scpls");
    }

    // Binary signatures
    // MP3: ID3v2 tag header
    if first_chunk.starts_with(b"ID3") {
        return Some("audio/mpeg");
    }
    // AAC ADTS sync: 0xFF 0xF1 (MPEG-4) or 0xFF 0xF9 (MPEG-2).
    // Checked before the generic MPEG frame sync, which it also matches.
    if first_chunk[0] == 0xFF && matches!(first_chunk[1], 0xF1 | 0xF9) {
        return Some("audio/aac");
    }
    // MPEG audio frame sync: 11 set bits (rough check on the first two bytes)
    if first_chunk[0] == 0xFF && first_chunk[1] & 0xE0 == 0xE0 {
        return Some("audio/mpeg");
    }
    if first_chunk.starts_with(b"OggS") {
        return Some("audio/ogg");
    }
    if first_chunk.starts_with(b"fLaC") {
        return Some("audio/flac");
    }

    None
}

/// Returns true if the declared content-type is absent-equivalent garbage
/// that a sniffed type should replace.
pub fn declared_type_is_unreliable(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    UNRELIABLE_CONTENT_TYPES.iter().any(|bad| ct.contains(bad))
}

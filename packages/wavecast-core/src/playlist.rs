//! Playlist detection and resolution.
//!
//! Many station directories hand out a tiny M3U/M3U8/PLS text file instead of
//! the stream itself. These pure functions decide whether a response looks
//! like such a playlist and, if so, extract the first embedded stream URI so
//! the proxy can follow the indirection with a second fetch.

use url::Url;

/// Content-type fragments that mark a response as a playlist.
///
/// Substring matching on purpose: servers send variants like
/// `audio/x-mpegurl; charset=utf-8` or `application/vnd.apple.mpegurl`.
const PLAYLIST_CONTENT_TYPES: &[&str] =
    &["mpegurl", "x-mpegurl", "vnd.apple.mpegurl", "scpls", "playlist"];

/// Path extensions checked when the content-type is not conclusive.
const PLAYLIST_EXTENSIONS: &[&str] = &[".m3u", ".m3u8", ".pls"];

/// Returns true if the response should be treated as a playlist.
///
/// The declared content-type takes precedence; the URL path extension is a
/// fallback for servers that label playlists as `text/plain` or worse.
pub fn is_playlist_candidate(content_type: Option<&str>, url: &Url) -> bool {
    if let Some(ct) = content_type {
        let ct = ct.to_ascii_lowercase();
        if PLAYLIST_CONTENT_TYPES.iter().any(|m| ct.contains(m)) {
            return true;
        }
    }

    let path = url.path().to_ascii_lowercase();
    PLAYLIST_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Extracts the first stream URI from playlist text.
///
/// Two passes, in order:
/// 1. PLS: `FileN=<uri>` entries (case-insensitive key, N any digits) —
///    the first entry with a valid http/https value wins.
/// 2. M3U / generic: the first non-comment line that parses as an
///    http/https URI.
///
/// Tolerates CRLF and LF line endings and per-line whitespace. Returns
/// `None` when neither pass yields a valid URI; the caller then serves the
/// original response unchanged.
pub fn resolve_playlist(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    // PLS first
    for line in &lines {
        if let Some(value) = pls_file_value(line) {
            let value = value.trim();
            if is_http_url(value) {
                return Some(value.to_string());
            }
        }
    }

    // M3U / generic
    for line in &lines {
        if line.starts_with('#') {
            continue;
        }
        if is_http_url(line) {
            return Some(line.to_string());
        }
    }

    None
}

/// Matches a PLS `FileN=` key and returns the value part, if any.
fn pls_file_value(line: &str) -> Option<&str> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();

    let rest = key
        .get(..4)
        .filter(|prefix| prefix.eq_ignore_ascii_case("file"))
        .map(|_| &key[4..])?;

    if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
        Some(value)
    } else {
        None
    }
}

/// Returns true if `s` parses as an absolute http/https URL.
pub fn is_http_url(s: &str) -> bool {
    match Url::parse(s) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

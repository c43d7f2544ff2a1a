//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by external specifications (ICY/Shoutcast
//! conventions, browser CORS requirements) or by observed upstream behavior,
//! and changing them would alter the proxy's wire contract.

use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Upstream Timeouts
// ─────────────────────────────────────────────────────────────────────────────

/// Wall-clock timeout for the streaming proxy's upstream fetch (headers phase).
///
/// Covers the time from issuing the request until response headers arrive.
/// Once the body is streaming, delivery is open-ended (radio streams are
/// unbounded in duration) and no longer subject to this timeout.
pub const STREAM_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Wall-clock timeout for the whole metadata resolution operation.
///
/// Unlike the streaming timeout, this covers fetch, audio skip, and metadata
/// block parsing end to end: the /icy endpoint must answer promptly or not
/// at all.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(8);

// ─────────────────────────────────────────────────────────────────────────────
// MIME Sniffing
// ─────────────────────────────────────────────────────────────────────────────

/// Minimum number of leading bytes required before sniffing is attempted.
///
/// The longest binary signature (`OggS`, `fLaC`) is four bytes; with fewer
/// bytes available the sniffer yields no result and the upstream-declared
/// type is kept.
pub const SNIFF_MIN_BYTES: usize = 4;

/// Number of leading bytes inspected for textual playlist markers.
pub const SNIFF_TEXT_WINDOW: usize = 64;

// ─────────────────────────────────────────────────────────────────────────────
// ICY Protocol (Shoutcast/Icecast metadata)
// ─────────────────────────────────────────────────────────────────────────────

/// Size unit of an ICY metadata block.
///
/// The single length-indicator byte that follows each audio run counts
/// 16-byte units: block length = indicator × 16. This is a protocol
/// specification constant, not a tunable parameter.
pub const ICY_BLOCK_UNIT: usize = 16;

/// Request header used to negotiate interleaved ICY metadata.
pub const ICY_METADATA_HEADER: &str = "Icy-MetaData";

// ─────────────────────────────────────────────────────────────────────────────
// Outbound Identity
// ─────────────────────────────────────────────────────────────────────────────

/// User-Agent sent by the streaming proxy.
///
/// Some Shoutcast servers answer differently (or not at all) to an empty
/// User-Agent, so we always identify ourselves.
pub const STREAM_USER_AGENT: &str = "wavecast-stream-proxy/0.3";

/// User-Agent sent by the metadata probe.
pub const ICY_USER_AGENT: &str = "wavecast-icy/0.3";

// ─────────────────────────────────────────────────────────────────────────────
// CORS Surface
// ─────────────────────────────────────────────────────────────────────────────

/// Methods browsers may use against the proxy endpoints.
pub const CORS_ALLOW_METHODS: &str = "GET,HEAD,OPTIONS";

/// Request headers browsers may send, notably `Range` for seek attempts.
pub const CORS_ALLOW_HEADERS: &str = "Range,Content-Type,Accept,Origin";

/// Response headers exposed to browser JavaScript.
///
/// The icy-* headers let a web player show station name and bitrate without
/// a second round trip through /icy.
pub const CORS_EXPOSE_HEADERS: &str =
    "Content-Length,Content-Range,Accept-Ranges,Content-Type,icy-br,icy-metaint,icy-name,icy-description";

/// Cache directive attached to every response.
///
/// `no-transform` matters: intermediary re-encoding would corrupt sniffed
/// audio and desynchronize ICY metadata intervals.
pub const CACHE_CONTROL_VALUE: &str = "no-store, no-transform";

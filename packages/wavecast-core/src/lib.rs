//! Wavecast Core - shared library for the Wavecast streaming proxy.
//!
//! This crate provides the core functionality for Wavecast, an HTTP proxy
//! that makes internet radio stations playable from browsers: it relays
//! audio byte streams with a browser-compatible CORS and content-type
//! surface, and extracts ICY now-playing metadata on demand.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`fetch`]: Upstream HTTP fetching with bounded timeouts
//! - [`playlist`]: M3U/PLS playlist detection and resolution
//! - [`sniff`]: Media type sniffing from leading stream bytes
//! - [`stream`]: Byte stream relaying and ICY metadata parsing
//! - [`api`]: HTTP endpoints, router, and server startup
//! - [`config`]: Operator-tunable runtime configuration
//! - [`error`]: Centralized error types
//!
//! The two endpoints share one upstream client but never share state per
//! request: the proxy is stateless by construction.

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod playlist;
pub mod protocol_constants;
pub mod sniff;
pub mod stream;

// Re-export commonly used types at the crate root
pub use api::{start_server, AppState, ServerError};
pub use config::ProxyConfig;
pub use error::{ProxyError, ProxyResult};
pub use fetch::{validate_target, FetchOptions, UpstreamFetcher, UpstreamRequest};
pub use stream::{IcyHeaders, IcyMetadataBlock};

//! Tunable proxy configuration.
//!
//! Protocol-defined values live in [`crate::protocol_constants`]; this is the
//! small set of knobs an operator may reasonably override (deployments behind
//! slow satellite upstreams exist). Defaults match the constants.

use std::time::Duration;

use serde::Deserialize;

use crate::protocol_constants::{METADATA_TIMEOUT, STREAM_FETCH_TIMEOUT};

/// Runtime configuration for the proxy core.
///
/// Immutable after startup: there is no cross-request shared mutable state,
/// so a plain clone into `AppState` is all the lifecycle this needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Seconds to wait for upstream response headers on /stream.
    pub stream_fetch_timeout_secs: u64,

    /// Seconds for the whole /icy metadata resolution (fetch + skip + parse).
    pub metadata_timeout_secs: u64,
}

impl ProxyConfig {
    /// Headers-phase timeout for streaming fetches.
    pub fn stream_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_fetch_timeout_secs)
    }

    /// End-to-end budget for metadata resolution.
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            stream_fetch_timeout_secs: STREAM_FETCH_TIMEOUT.as_secs(),
            metadata_timeout_secs: METADATA_TIMEOUT.as_secs(),
        }
    }
}

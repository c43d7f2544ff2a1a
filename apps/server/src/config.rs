//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use wavecast_core::ProxyConfig;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to.
    /// Override: `WAVECAST_BIND_PORT`
    pub bind_port: u16,

    /// Seconds to wait for upstream response headers on /stream.
    /// Override: `WAVECAST_STREAM_FETCH_TIMEOUT`
    pub stream_fetch_timeout: u64,

    /// Seconds for the whole /icy metadata resolution.
    /// Override: `WAVECAST_METADATA_TIMEOUT`
    pub metadata_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let proxy = ProxyConfig::default();
        Self {
            bind_port: 49600,
            stream_fetch_timeout: proxy.stream_fetch_timeout_secs,
            metadata_timeout: proxy.metadata_timeout_secs,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("WAVECAST_STREAM_FETCH_TIMEOUT") {
            if let Ok(secs) = val.parse() {
                self.stream_fetch_timeout = secs;
            }
        }

        if let Ok(val) = std::env::var("WAVECAST_METADATA_TIMEOUT") {
            if let Ok(secs) = val.parse() {
                self.metadata_timeout = secs;
            }
        }

        // Note: WAVECAST_BIND_PORT is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to wavecast-core's config type.
    pub fn to_proxy_config(&self) -> ProxyConfig {
        ProxyConfig {
            stream_fetch_timeout_secs: self.stream_fetch_timeout,
            metadata_timeout_secs: self.metadata_timeout,
        }
    }
}

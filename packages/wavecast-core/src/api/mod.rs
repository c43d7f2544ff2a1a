//! HTTP API layer.
//!
//! This module contains thin handlers that delegate to the fetch, playlist,
//! sniff, and stream modules. It provides the router construction and server
//! startup functionality.

use std::sync::Arc;

use thiserror::Error;

use crate::config::ProxyConfig;
use crate::error::ProxyResult;
use crate::fetch::UpstreamFetcher;

pub mod http;
pub mod response;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared application state for the API layer.
///
/// Immutable after startup: the fetcher is a shared connection pool and the
/// config is read-only, so handlers never contend on anything.
#[derive(Clone)]
pub struct AppState {
    /// Shared upstream HTTP client.
    pub fetcher: Arc<UpstreamFetcher>,
    /// Runtime configuration.
    pub config: ProxyConfig,
}

impl AppState {
    /// Builds the state, constructing the shared upstream client.
    pub fn new(config: ProxyConfig) -> ProxyResult<Self> {
        Ok(Self {
            fetcher: Arc::new(UpstreamFetcher::new()?),
            config,
        })
    }
}

/// Starts the HTTP server on the given port (0 picks an ephemeral port).
pub async fn start_server(state: AppState, port: u16) -> Result<(), ServerError> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!(
        "Server listening on http://0.0.0.0:{}",
        listener.local_addr()?.port()
    );

    let app = http::create_router(state);
    axum::serve(listener, app).await?;
    Ok(())
}

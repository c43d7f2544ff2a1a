//! Upstream fetching with bounded timeouts.
//!
//! One shared `reqwest::Client` per process, one outbound connection per
//! call, no retries: an upstream failure is surfaced to the caller as a
//! terminal error. Only an explicit allow-list of request headers is
//! forwarded so client-specific noise never reaches the station.

use std::time::Duration;

use reqwest::header;
use reqwest::Method;
use url::Url;

use crate::config::ProxyConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::protocol_constants::{ICY_METADATA_HEADER, ICY_USER_AGENT, STREAM_USER_AGENT};

/// Maximum redirect hops before the fetch is abandoned.
const MAX_REDIRECTS: usize = 10;

/// A validated outbound request, constructed once per inbound request.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    /// Validated absolute http/https target.
    pub url: Url,
    /// Byte-range string forwarded verbatim from the inbound request.
    pub forwarded_range: Option<String>,
    /// Issue HEAD instead of GET (inbound HEAD is forwarded as HEAD).
    pub method_is_head: bool,
}

impl UpstreamRequest {
    /// Creates a plain GET request for the target.
    pub fn get(url: Url) -> Self {
        Self {
            url,
            forwarded_range: None,
            method_is_head: false,
        }
    }
}

/// Per-call fetch behavior.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Negotiate interleaved ICY metadata (`Icy-MetaData: 1`). Never set for
    /// audio playback: players cannot handle the interleaved blocks.
    pub icy_metadata: bool,
    /// Wall-clock budget for the headers phase of this call.
    pub headers_timeout: Duration,
    /// Identity presented to the upstream server.
    pub user_agent: &'static str,
}

impl FetchOptions {
    /// Options for the /stream proxy path.
    pub fn streaming(config: &ProxyConfig) -> Self {
        Self {
            icy_metadata: false,
            headers_timeout: config.stream_fetch_timeout(),
            user_agent: STREAM_USER_AGENT,
        }
    }

    /// Options for the /icy metadata probe.
    pub fn metadata(config: &ProxyConfig) -> Self {
        Self {
            icy_metadata: true,
            headers_timeout: config.metadata_timeout(),
            user_agent: ICY_USER_AGENT,
        }
    }
}

/// Validates a raw `url` query parameter into a fetchable target.
///
/// Runs before any network activity: a malformed URI or a scheme other than
/// http/https is rejected as [`ProxyError::InvalidTarget`].
pub fn validate_target(raw: &str) -> ProxyResult<Url> {
    let url = Url::parse(raw)
        .map_err(|_| ProxyError::InvalidTarget(format!("not an absolute URI: {}", raw)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ProxyError::InvalidTarget(format!(
            "scheme '{}' is not allowed (http/https only)",
            other
        ))),
    }
}

/// Bounded-timeout HTTP client shared by both endpoints.
#[derive(Clone)]
pub struct UpstreamFetcher {
    client: reqwest::Client,
}

impl UpstreamFetcher {
    /// Builds the shared client. Redirects are followed transparently up to
    /// [`MAX_REDIRECTS`] hops; per-call timeouts are applied in [`fetch`].
    ///
    /// [`fetch`]: UpstreamFetcher::fetch
    pub fn new() -> ProxyResult<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| ProxyError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Issues one outbound GET/HEAD and waits for response headers.
    ///
    /// The timeout is armed when the request is sent and fires at most once;
    /// dropping the in-flight future on expiry cancels the attempt, so no
    /// dangling connection survives the error path. Completion (success or
    /// failure) disarms the timer by construction.
    ///
    /// Single attempt: timeouts and network failures are terminal.
    pub async fn fetch(
        &self,
        request: &UpstreamRequest,
        options: FetchOptions,
    ) -> ProxyResult<reqwest::Response> {
        let method = if request.method_is_head {
            Method::HEAD
        } else {
            Method::GET
        };

        let mut builder = self
            .client
            .request(method.clone(), request.url.clone())
            .header(header::ACCEPT, "*/*")
            .header(header::ACCEPT_ENCODING, "identity")
            .header(header::USER_AGENT, options.user_agent);

        if let Some(ref range) = request.forwarded_range {
            builder = builder.header(header::RANGE, range);
        }

        if options.icy_metadata {
            // A small open-ended range coaxes some servers into sending
            // headers and first bytes faster.
            builder = builder
                .header(ICY_METADATA_HEADER, "1")
                .header(header::RANGE, "bytes=0-");
        }

        log::debug!(
            "[Fetch] {} {} (headers timeout {:?})",
            method,
            request.url,
            options.headers_timeout
        );

        match tokio::time::timeout(options.headers_timeout, builder.send()).await {
            Ok(Ok(response)) => {
                log::debug!(
                    "[Fetch] {} -> {} ({})",
                    request.url,
                    response.status(),
                    response
                        .headers()
                        .get(header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("no content-type")
                );
                Ok(response)
            }
            Ok(Err(e)) => Err(map_reqwest_error(e)),
            Err(_) => Err(ProxyError::UpstreamTimeout(format!(
                "no response headers within {}s",
                options.headers_timeout.as_secs()
            ))),
        }
    }
}

/// Maps reqwest failures onto the proxy error taxonomy.
pub(crate) fn map_reqwest_error(e: reqwest::Error) -> ProxyError {
    if e.is_timeout() {
        ProxyError::UpstreamTimeout(e.to_string())
    } else {
        ProxyError::UpstreamUnreachable(e.to_string())
    }
}

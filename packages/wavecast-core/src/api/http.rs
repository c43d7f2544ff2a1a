//! HTTP route handlers.
//!
//! Both endpoints are registered with `any()` and dispatch on the method
//! themselves: OPTIONS answers the CORS preflight, unsupported methods get
//! 405, and everything else flows into the handler body. All handlers are
//! thin — playlist, sniffing, and ICY logic live in their own modules.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::response::{self, preflight};
use crate::api::AppState;
use crate::error::{ProxyError, ProxyResult};
use crate::fetch::{map_reqwest_error, validate_target, FetchOptions, UpstreamRequest};
use crate::playlist;
use crate::sniff::{declared_type_is_unreliable, sniff_mime};
use crate::stream::{read_first_chunk, read_first_title, replay_with_prefix, IcyHeaders};

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TargetQuery {
    url: Option<String>,
}

impl TargetQuery {
    /// Validates the `url` parameter; runs before any network activity.
    fn target(&self) -> ProxyResult<Url> {
        let raw = self
            .url
            .as_deref()
            .ok_or_else(|| ProxyError::InvalidTarget("missing url parameter".into()))?;
        validate_target(raw)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with both proxy endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/stream", any(stream_handler))
        .route("/icy", any(icy_handler))
        .layer(response::cors_layer())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// /stream — audio proxy
// ─────────────────────────────────────────────────────────────────────────────

async fn stream_handler(
    State(state): State<AppState>,
    Query(query): Query<TargetQuery>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    if method == Method::OPTIONS {
        return preflight();
    }
    if method != Method::GET && method != Method::HEAD {
        return ProxyError::MethodNotAllowed.into_response();
    }

    match proxy_stream(&state, &query, &method, &headers).await {
        Ok(response) => response,
        Err(e) => {
            log::warn!("[Stream] {}: {}", e.code(), e);
            e.into_response()
        }
    }
}

async fn proxy_stream(
    state: &AppState,
    query: &TargetQuery,
    method: &Method,
    inbound_headers: &HeaderMap,
) -> ProxyResult<Response> {
    let url = query.target()?;

    let request = UpstreamRequest {
        url,
        forwarded_range: inbound_headers
            .get(header::RANGE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()),
        method_is_head: *method == Method::HEAD,
    };
    let options = FetchOptions::streaming(&state.config);

    log::info!("[Stream] {} {}", method, request.url);
    let mut upstream = state.fetcher.fetch(&request, options).await?;

    // Playlist indirection: follow the first embedded stream URI, one hop.
    // Every failure on this path is non-fatal — the buffered playlist text
    // is served as-is so the client sees what the station actually sent.
    let declared = content_type_of(upstream.headers());
    if playlist::is_playlist_candidate(declared.as_deref(), &request.url) {
        let status = upstream.status();
        let playlist_headers = upstream.headers().clone();
        let text = upstream.text().await.map_err(map_reqwest_error)?;

        let resolved = playlist::resolve_playlist(&text).and_then(|t| validate_target(&t).ok());
        match resolved {
            Some(target) => {
                log::info!("[Stream] Playlist resolved to {}", target);
                let follow = UpstreamRequest {
                    url: target,
                    ..request.clone()
                };
                match state.fetcher.fetch(&follow, options).await {
                    Ok(response) => upstream = response,
                    Err(e) => {
                        log::warn!("[Stream] Playlist target fetch failed, serving playlist body: {}", e);
                        return Ok(serve_buffered(status, &playlist_headers, text));
                    }
                }
            }
            None => {
                log::debug!("[Stream] No stream URI in playlist, serving body unchanged");
                return Ok(serve_buffered(status, &playlist_headers, text));
            }
        }
    }

    let status = upstream.status();
    let upstream_headers = upstream.headers().clone();
    let declared = content_type_of(&upstream_headers);

    // HEAD: status and headers only, the body is never polled. No bytes
    // means nothing to sniff, so the declared type passes through.
    if request.method_is_head {
        let mut out = filter_upstream_headers(&upstream_headers);
        if let Some(ct) = upstream_headers.get(header::CONTENT_TYPE) {
            out.insert(header::CONTENT_TYPE, ct.clone());
        }
        response::apply_cache_headers(&mut out);
        let mut response = Response::new(Body::empty());
        *response.status_mut() = status;
        *response.headers_mut() = out;
        return Ok(response);
    }

    // Pull the first chunk for sniffing, then hand the re-assembled stream
    // to the response body.
    let mut body = Box::pin(upstream.bytes_stream());
    let first_chunk = read_first_chunk(&mut body).await.map_err(map_reqwest_error)?;

    let sniffed = sniff_mime(&first_chunk);
    let content_type = select_content_type(declared.as_deref(), sniffed);
    if sniffed.is_some() && content_type.as_deref() != declared.as_deref() {
        log::debug!(
            "[Stream] Content-type override: {} (declared {})",
            content_type.as_deref().unwrap_or("none"),
            declared.as_deref().unwrap_or("none")
        );
    }

    let mut out = filter_upstream_headers(&upstream_headers);
    if let Some(ref ct) = content_type {
        out.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(ct)
                .map_err(|e| ProxyError::Internal(format!("invalid content-type value: {}", e)))?,
        );
    }
    response::apply_cache_headers(&mut out);

    let mut response = Response::new(Body::from_stream(replay_with_prefix(first_chunk, body)));
    *response.status_mut() = status;
    *response.headers_mut() = out;
    Ok(response)
}

/// Serves a buffered playlist body with its original status and headers.
///
/// The body was consumed to attempt resolution, so the text is replayed
/// rather than the (already disturbed) upstream stream.
fn serve_buffered(status: StatusCode, upstream_headers: &HeaderMap, text: String) -> Response {
    let mut out = filter_upstream_headers(upstream_headers);
    if let Some(ct) = upstream_headers.get(header::CONTENT_TYPE) {
        out.insert(header::CONTENT_TYPE, ct.clone());
    }
    // The buffered text may differ in length from the upstream framing
    // (charset decoding); let the server recompute it.
    out.remove(header::CONTENT_LENGTH);
    response::apply_cache_headers(&mut out);

    let mut response = Response::new(Body::from(text));
    *response.status_mut() = status;
    *response.headers_mut() = out;
    response
}

/// Picks the outbound content-type from the declared and sniffed candidates.
///
/// The sniffed type wins only when the declared one is absent or known to
/// break playback; a plausible declared audio type always passes through.
/// With neither available the header is omitted, matching the upstream.
fn select_content_type(declared: Option<&str>, sniffed: Option<&'static str>) -> Option<String> {
    match (declared, sniffed) {
        (Some(d), Some(s)) if declared_type_is_unreliable(d) => Some(s.to_string()),
        (Some(d), _) => Some(d.to_string()),
        (None, Some(s)) => Some(s.to_string()),
        (None, None) => None,
    }
}

/// Copies upstream response headers, dropping the ones the proxy owns.
///
/// `append` preserves duplicate headers (some stations send several icy-*
/// lines). Content-Type is dropped here because the caller re-inserts the
/// selected one; hop-by-hop headers never survive proxying. Content-Length
/// passes through: the relayed body is byte-exact, and range responses
/// need it alongside Content-Range.
fn filter_upstream_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in upstream.iter() {
        if is_stripped_header(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

fn is_stripped_header(name: &HeaderName) -> bool {
    name == header::CONNECTION
        || name == header::TRANSFER_ENCODING
        || name == header::CONTENT_TYPE
        || name == header::CACHE_CONTROL
        || name.as_str().starts_with("access-control-")
}

fn content_type_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// /icy — metadata probe
// ─────────────────────────────────────────────────────────────────────────────

/// JSON envelope returned by /icy on success.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IcySummary {
    ok: bool,
    url: String,
    content_type: String,
    icy_name: String,
    icy_br: String,
    icy_metaint: usize,
    bitrate: u32,
    title: String,
}

async fn icy_handler(
    State(state): State<AppState>,
    Query(query): Query<TargetQuery>,
    method: Method,
) -> Response {
    if method == Method::OPTIONS {
        return preflight();
    }
    // 405 is plain text even here: the JSON envelope is for resolution
    // outcomes, not for requests that never reach resolution.
    if method != Method::GET {
        return ProxyError::MethodNotAllowed.into_response();
    }

    let url = match query.target() {
        Ok(url) => url,
        Err(e) => return icy_error(e),
    };

    // The budget covers the whole resolution: fetch, audio skip, block parse.
    let budget = state.config.metadata_timeout();
    let resolved = tokio::time::timeout(budget, resolve_metadata(&state, url)).await;

    match resolved {
        Ok(Ok(summary)) => {
            log::info!("[Icy] {} -> title {:?}", summary.url, summary.title);
            response::json(
                StatusCode::OK,
                serde_json::to_value(&summary).unwrap_or_default(),
            )
        }
        Ok(Err(e)) => icy_error(e),
        Err(_) => icy_error(ProxyError::UpstreamTimeout(format!(
            "metadata resolution exceeded {}s",
            budget.as_secs()
        ))),
    }
}

/// Wraps a proxy error in the /icy JSON envelope.
fn icy_error(e: ProxyError) -> Response {
    log::warn!("[Icy] {}: {}", e.code(), e);
    response::json(
        e.status_code(),
        serde_json::json!({ "ok": false, "error": e.to_string() }),
    )
}

async fn resolve_metadata(state: &AppState, url: Url) -> ProxyResult<IcySummary> {
    let request = UpstreamRequest::get(url.clone());
    let options = FetchOptions::metadata(&state.config);

    let upstream = state.fetcher.fetch(&request, options).await?;
    let icy = IcyHeaders::from_header_map(upstream.headers());

    // Without a metadata interval there is nothing to read from the body
    let title = if icy.metaint > 0 {
        let body = Box::pin(upstream.bytes_stream());
        read_first_title(body, icy.metaint).await.title
    } else {
        String::new()
    };

    Ok(IcySummary {
        ok: true,
        url: url.to_string(),
        content_type: icy.content_type,
        icy_name: icy.name,
        icy_br: icy.bitrate_label,
        icy_metaint: icy.metaint,
        bitrate: icy.bitrate,
        title,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    mod content_type_selection {
        use super::*;

        #[test]
        fn sniffed_wins_over_unreliable_declared() {
            assert_eq!(
                select_content_type(Some("text/plain"), Some("audio/mpeg")).as_deref(),
                Some("audio/mpeg")
            );
            assert_eq!(
                select_content_type(Some("audio/aacp"), Some("audio/aac")).as_deref(),
                Some("audio/aac")
            );
        }

        #[test]
        fn plausible_declared_is_never_overridden() {
            assert_eq!(
                select_content_type(Some("audio/ogg"), Some("audio/mpeg")).as_deref(),
                Some("audio/ogg")
            );
        }

        #[test]
        fn sniffed_fills_in_missing_declared() {
            assert_eq!(
                select_content_type(None, Some("audio/flac")).as_deref(),
                Some("audio/flac")
            );
        }

        #[test]
        fn unreliable_declared_without_sniff_passes_through() {
            assert_eq!(
                select_content_type(Some("text/plain"), None).as_deref(),
                Some("text/plain")
            );
        }

        #[test]
        fn neither_available_omits_the_header() {
            assert_eq!(select_content_type(None, None), None);
        }
    }

    mod header_filtering {
        use super::*;

        #[test]
        fn proxy_owned_headers_are_stripped() {
            let mut upstream = HeaderMap::new();
            upstream.insert(header::CONNECTION, HeaderValue::from_static("close"));
            upstream.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
            upstream.insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("http://x.example"),
            );
            upstream.insert("icy-name", HeaderValue::from_static("Test FM"));

            let out = filter_upstream_headers(&upstream);
            assert!(out.get(header::CONNECTION).is_none());
            assert!(out.get(header::CONTENT_TYPE).is_none());
            assert!(out.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
            assert_eq!(out["icy-name"], "Test FM");
        }

        #[test]
        fn content_length_passes_through() {
            // The relayed body is byte-exact, so upstream framing holds;
            // range responses in particular need Content-Length intact.
            let mut upstream = HeaderMap::new();
            upstream.insert(header::CONTENT_LENGTH, HeaderValue::from_static("4096"));
            upstream.insert(header::CONTENT_RANGE, HeaderValue::from_static("bytes 0-4095/128000"));

            let out = filter_upstream_headers(&upstream);
            assert_eq!(out[header::CONTENT_LENGTH], "4096");
            assert_eq!(out[header::CONTENT_RANGE], "bytes 0-4095/128000");
        }

        #[test]
        fn duplicate_headers_survive() {
            let mut upstream = HeaderMap::new();
            upstream.append("icy-notice", HeaderValue::from_static("one"));
            upstream.append("icy-notice", HeaderValue::from_static("two"));

            let out = filter_upstream_headers(&upstream);
            assert_eq!(out.get_all("icy-notice").iter().count(), 2);
        }
    }
}

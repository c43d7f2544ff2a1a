//! Response construction helpers.
//!
//! CORS lives in the `tower_http` layer attached to the router; the helpers
//! here cover what the layer does not — the cache directives every response
//! carries, and the bodies of plain-text and JSON replies.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tower_http::cors::{Any, CorsLayer};

use crate::protocol_constants::{
    CACHE_CONTROL_VALUE, CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS, CORS_EXPOSE_HEADERS,
};

/// CORS layer for the whole router.
///
/// Wildcard origin, the fixed method and request-header lists, and the
/// icy-* expose surface so a web player can read station name and bitrate
/// from the relayed response headers.
pub fn cors_layer() -> CorsLayer {
    let expose: Vec<HeaderName> = CORS_EXPOSE_HEADERS
        .split(',')
        .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([
            header::RANGE,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
        ])
        .expose_headers(expose)
}

/// Applies the cache directives attached to every proxy response.
pub fn apply_cache_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL_VALUE),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
}

/// Builds a plain-text response with the proxy's standard headers.
pub fn plain_text(status: StatusCode, message: &str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    apply_cache_headers(&mut headers);
    (status, headers, message.to_string()).into_response()
}

/// Builds a JSON response with the proxy's standard headers.
pub fn json(status: StatusCode, value: serde_json::Value) -> Response {
    let mut headers = HeaderMap::new();
    apply_cache_headers(&mut headers);
    (status, headers, Json(value)).into_response()
}

/// Answers a bare OPTIONS request: 204 with the allow lists and no body.
///
/// Real CORS preflights (Origin plus Access-Control-Request-Method) are
/// answered by the layer before any handler runs; this covers clients
/// probing with a plain OPTIONS, which still get the allow lists.
pub fn preflight() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(CORS_ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
    apply_cache_headers(&mut headers);
    (StatusCode::NO_CONTENT, headers).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_directives_are_fixed() {
        let mut headers = HeaderMap::new();
        apply_cache_headers(&mut headers);
        assert_eq!(headers[header::CACHE_CONTROL], "no-store, no-transform");
        assert_eq!(headers[header::PRAGMA], "no-cache");
    }

    #[test]
    fn preflight_is_204_with_allow_lists() {
        let response = preflight();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET,HEAD,OPTIONS"
        );
        assert!(response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS]
            .to_str()
            .unwrap()
            .contains("Range"));
    }

    #[test]
    fn every_exposed_header_is_a_valid_name() {
        // The layer builds its expose list from the constant; a typo there
        // would be dropped silently by filter_map.
        assert!(CORS_EXPOSE_HEADERS
            .split(',')
            .all(|name| HeaderName::from_bytes(name.as_bytes()).is_ok()));
    }

    #[test]
    fn plain_text_sets_content_type_and_cache() {
        let response = plain_text(StatusCode::BAD_REQUEST, "Invalid target");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "no-store, no-transform"
        );
    }
}

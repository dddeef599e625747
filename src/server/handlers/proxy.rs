use crate::{
    error::Result,
    metrics,
    server::{public_url::public_base_url, state::AppState},
};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use serde::Deserialize;

/// Query parameters of `/proxy`
#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    /// Absolute URL of the playlist, key or segment to relay
    pub url: Option<String>,
}

/// Relay a playlist or media resource from its origin.
///
/// Playlists come back rewritten so every reference routes through this
/// endpoint again; everything else is streamed through unchanged.
pub async fn serve_proxy(
    Query(params): Query<ProxyParams>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response> {
    let proxy_base = public_base_url(&headers, &state.config);

    let result = state
        .relay
        .dispatch(params.url.as_deref(), &proxy_base, headers.get(header::RANGE))
        .await;

    if let Err(e) = &result {
        metrics::record_failure(e.kind());
    }
    result
}

/// CORS preflight; the headers themselves come from [`relay_headers`].
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Response middleware for every `/proxy` response, errors included:
/// any origin may consume it and no cache may keep it.
pub async fn relay_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Content-Length, Content-Range, Accept-Ranges"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

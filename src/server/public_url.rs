//! Externally visible base URL of the relay.
//!
//! Rewritten playlists must point clients back at the relay as *they* reach
//! it, which may differ per request (different hostnames, ports, or a TLS
//! terminating reverse proxy in front).

use crate::config::Config;
use axum::http::{HeaderMap, header};
use tracing::debug;
use url::Url;

/// Scheme + host (no trailing slash) that clients use to reach this relay.
///
/// Priority: configured `public_base_url`, then `X-Forwarded-Proto` /
/// `X-Forwarded-Host`, then the `Host` header, then `localhost:<port>`.
/// A header that is not a bare `host[:port]` authority is skipped.
pub fn public_base_url(headers: &HeaderMap, config: &Config) -> String {
    if let Some(base) = &config.public_base_url {
        return base.trim_end_matches('/').to_string();
    }

    let host = ["x-forwarded-host", header::HOST.as_str()]
        .into_iter()
        .filter_map(|name| first_value(headers, name).map(|v| (name, v)))
        .find(|(name, value)| {
            let ok = is_authority(value);
            if !ok {
                debug!("Ignoring {} header not usable as a host: {:?}", name, value);
            }
            ok
        })
        .map(|(_, value)| value.to_string())
        .unwrap_or_else(|| format!("localhost:{}", config.port));

    let scheme = first_value(headers, "x-forwarded-proto")
        .filter(|s| s.eq_ignore_ascii_case("http") || s.eq_ignore_ascii_case("https"))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "http".to_string());

    format!("{scheme}://{host}")
}

/// `host[:port]` and nothing else: no userinfo, path, query, quotes or spaces.
fn is_authority(value: &str) -> bool {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | ':' | '[' | ']');
    if !value.chars().all(allowed) {
        return false;
    }
    Url::parse(&format!("http://{value}"))
        .is_ok_and(|u| u.host_str().is_some() && u.path() == "/")
}

/// First comma-separated value of a header (the client-facing hop).
fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

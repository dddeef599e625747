//! Outbound HTTP to origins.
//!
//! One shared [`Client`] per process so connections to origins are pooled
//! across requests. Each fetch is a single attempt: a failed origin is
//! reported to the caller immediately.

use crate::config::Config;
use crate::error::{RelayError, Result};
use axum::http::{HeaderValue, header};
use reqwest::{Client, Response, redirect};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Build the shared origin client from configuration.
pub fn build_client(config: &Config) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(redirect::Policy::limited(config.max_redirects))
        .connect_timeout(config.upstream_timeout())
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))
}

/// GET `url` from the origin, waiting at most `timeout` for the response head.
///
/// `range` is forwarded as-is so range-aware players can seek.
///
/// # Errors
/// - [`RelayError::Timeout`] when no response head arrives in time
/// - [`RelayError::Transport`] when the origin cannot be reached
/// - [`RelayError::UpstreamStatus`] for any non-2xx status
pub async fn fetch(
    client: &Client,
    url: &Url,
    range: Option<&HeaderValue>,
    timeout: Duration,
) -> Result<Response> {
    let mut request = client.get(url.clone());
    if let Some(range) = range {
        request = request.header(header::RANGE, range.clone());
    }

    let response = tokio::time::timeout(timeout, request.send())
        .await
        .map_err(|_| {
            warn!("Upstream fetch timed out after {}s: {}", timeout.as_secs(), url);
            RelayError::Timeout {
                url: url.to_string(),
                secs: timeout.as_secs(),
            }
        })?
        .map_err(|e| {
            warn!("Upstream fetch failed for {}: {}", url, e);
            RelayError::Transport(e)
        })?;

    let status = response.status();
    if !status.is_success() {
        warn!("Upstream returned {} for {}", status, url);
        return Err(RelayError::UpstreamStatus {
            status,
            url: url.to_string(),
        });
    }

    debug!("Upstream {} answered {}", response.url(), status);
    Ok(response)
}

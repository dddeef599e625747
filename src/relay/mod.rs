//! Relay dispatcher: one proxy request end to end.
//!
//! ```text
//! validate ─▶ fetch ─▶ classify ─┬─▶ playlist: buffer, decode, rewrite, respond
//!                                └─▶ binary:   stream chunks, respond
//! ```
//!
//! Any failure along the way becomes a [`RelayError`], which the HTTP layer
//! turns into a response. Nothing is retried and nothing outlives the request.

pub mod classify;
pub mod stream;
pub mod upstream;
pub mod url_validation;

use crate::{
    config::Config,
    error::{RelayError, Result},
    hls::{self, HLS_CONTENT_TYPE},
    metrics,
};
use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use classify::{Classification, classify, has_playlist_extension};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// Upstream headers copied onto relayed binary responses
const FORWARDED_BINARY_HEADERS: [header::HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::ACCEPT_RANGES,
    header::CONTENT_RANGE,
];

/// Handles relay requests against a shared origin client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct RelayDispatcher {
    client: Client,
    timeout: Duration,
    /// Raise per-request upstream details from debug to info
    verbose: bool,
}

impl RelayDispatcher {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: upstream::build_client(config)?,
            timeout: config.upstream_timeout(),
            verbose: config.debug,
        })
    }

    /// Relay `target` (the raw `url` parameter) for a client that reaches
    /// this relay at `proxy_base`.
    ///
    /// `range` is the client's `Range` header, forwarded to the origin unless
    /// the target is a playlist: a playlist is only ever rewritten whole.
    pub async fn dispatch(
        &self,
        target: Option<&str>,
        proxy_base: &str,
        range: Option<&HeaderValue>,
    ) -> Result<Response> {
        let start = Instant::now();
        let target = url_validation::validate_target_url(target)?;
        info!("Relaying {}", target);

        let range = range.filter(|_| !has_playlist_extension(&target));
        let response = upstream::fetch(&self.client, &target, range, self.timeout).await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let classification = classify(content_type, &target);
        self.log_upstream(&response, classification);

        match classification {
            Classification::Playlist => {
                let relayed = self.relay_playlist(response, proxy_base).await?;
                metrics::record_request("playlist", relayed.status().as_u16());
                metrics::record_duration("playlist", start);
                Ok(relayed)
            }
            Classification::Binary => {
                let relayed = self.relay_binary(response);
                metrics::record_request("segment", relayed.status().as_u16());
                metrics::record_duration("segment", start);
                Ok(relayed)
            }
        }
    }

    /// Buffer, decode and rewrite a playlist.
    ///
    /// References resolve against the URL the text was finally served from,
    /// which differs from the requested one after a redirect.
    async fn relay_playlist(&self, response: reqwest::Response, proxy_base: &str) -> Result<Response> {
        let served_from: Url = response.url().clone();

        // A 206 slice would rewrite its cut-off last line into a bogus reference
        if response.status() != StatusCode::OK {
            return Err(RelayError::IncompletePlaylist {
                status: response.status(),
                url: served_from.to_string(),
            });
        }

        let bytes = tokio::time::timeout(self.timeout, response.bytes())
            .await
            .map_err(|_| RelayError::Timeout {
                url: served_from.to_string(),
                secs: self.timeout.as_secs(),
            })??;

        let text = std::str::from_utf8(&bytes)?;
        let rewritten = hls::rewrite_playlist(text, &served_from, proxy_base);
        debug!(
            "Rewrote playlist {} ({} -> {} bytes)",
            served_from,
            bytes.len(),
            rewritten.len()
        );

        Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HLS_CONTENT_TYPE),
                (header::CONTENT_DISPOSITION, "inline"),
                (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
            ],
            rewritten,
        )
            .into_response())
    }

    /// Stream a segment, key or other binary resource through unchanged.
    fn relay_binary(&self, response: reqwest::Response) -> Response {
        let status = response.status();
        let forwarded = forwarded_headers(response.headers());

        let body = stream::relay_body(response.bytes_stream(), stream::RELAY_CHUNK_SIZE, self.timeout);

        let mut relayed = Response::new(body);
        *relayed.status_mut() = status;
        relayed.headers_mut().extend(forwarded);
        relayed
    }

    fn log_upstream(&self, response: &reqwest::Response, classification: Classification) {
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        if self.verbose {
            info!(
                status = %response.status(),
                content_type,
                ?classification,
                headers = ?response.headers(),
                "Upstream response for {}",
                response.url()
            );
        } else {
            debug!(
                status = %response.status(),
                content_type,
                ?classification,
                "Upstream response for {}",
                response.url()
            );
        }
    }
}

fn forwarded_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in FORWARDED_BINARY_HEADERS {
        if let Some(value) = upstream.get(&name) {
            headers.insert(name, value.clone());
        }
    }
    headers
}

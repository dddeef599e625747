use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, RelayError>;

/// Every way a relay request can fail.
///
/// Each variant maps to exactly one HTTP status so a player can tell a
/// malformed request from an origin failure from a relay failure.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("URL parameter is required")]
    MissingUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus { status: StatusCode, url: String },

    #[error("Upstream timed out after {secs}s: {url}")]
    Timeout { url: String, secs: u64 },

    #[error("Failed to reach upstream: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upstream answered {status} instead of a complete playlist for {url}")]
    IncompletePlaylist { status: StatusCode, url: String },

    #[error("Playlist is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingUrl | RelayError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            RelayError::UpstreamStatus { status, .. } => *status,
            RelayError::Timeout { .. }
            | RelayError::Transport(_)
            | RelayError::IncompletePlaylist { .. }
            | RelayError::Decode(_)
            | RelayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short stable label, used as a metrics dimension
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::MissingUrl | RelayError::InvalidUrl(_) => "bad_request",
            RelayError::UpstreamStatus { .. } => "upstream_status",
            RelayError::Timeout { .. } | RelayError::Transport(_) => "transport",
            RelayError::IncompletePlaylist { .. } => "incomplete_playlist",
            RelayError::Decode(_) => "decode",
            RelayError::Config(_) => "config",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Relay failed ({}): {}", status, self);
        } else {
            warn!("Relay rejected ({}): {}", status, self);
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_classes_map_to_400() {
        assert_eq!(RelayError::MissingUrl.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::InvalidUrl("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(RelayError::MissingUrl.to_string(), "URL parameter is required");
    }

    #[test]
    fn upstream_status_is_passed_through() {
        let err = RelayError::UpstreamStatus {
            status: StatusCode::NOT_FOUND,
            url: "https://cdn.example.com/a.m3u8".into(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.kind(), "upstream_status");
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn transport_and_decode_are_distinguishable_500s() {
        let timeout = RelayError::Timeout {
            url: "https://cdn.example.com/a.ts".into(),
            secs: 30,
        };
        let bytes = [0xffu8, 0xfe];
        let decode = RelayError::from(std::str::from_utf8(&bytes).unwrap_err());

        assert_eq!(timeout.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(decode.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_ne!(timeout.kind(), decode.kind());
        assert!(decode.to_string().starts_with("Playlist is not valid UTF-8"));
    }

    #[test]
    fn partial_playlist_is_a_relay_failure_not_a_passthrough() {
        let err = RelayError::IncompletePlaylist {
            status: StatusCode::PARTIAL_CONTENT,
            url: "https://cdn.example.com/live/index.m3u8".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), "incomplete_playlist");
        assert!(err.to_string().contains("206"));
    }

    #[test]
    fn into_response_carries_message() {
        let resp = RelayError::InvalidUrl("not-a-url".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let ct = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(ct.starts_with("text/plain"));
    }
}

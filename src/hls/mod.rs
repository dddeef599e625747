//! HLS playlist handling

pub mod rewriter;

pub use rewriter::{directory_base, proxy_url, resolve_reference, rewrite_playlist};

/// Media type served for rewritten playlists
pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

//! Rewriting HTTP relay for HLS streams.
//!
//! Playlists fetched through `/proxy` come back with every segment, key and
//! variant reference rewritten to route through the relay again; segments
//! and keys are streamed through unchanged.

pub mod config;
pub mod error;
pub mod hls;
pub mod metrics;
pub mod relay;
pub mod server;

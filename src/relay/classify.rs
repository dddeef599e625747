//! Playlist vs. binary classification of an upstream response.

use url::Url;

/// Media types that identify an HLS playlist
const PLAYLIST_CONTENT_TYPES: &[&str] = &[
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "audio/mpegurl",
    "audio/x-mpegurl",
];

const PLAYLIST_EXTENSION: &str = ".m3u8";

/// How the relay handles a fetched resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Buffered, decoded and rewritten
    Playlist,
    /// Streamed through untouched
    Binary,
}

/// Decide whether a response is a playlist.
///
/// The declared content type wins when it names a playlist type. Origins
/// often mislabel playlists (`text/plain`, `application/octet-stream`), so a
/// `.m3u8` path on the requested URL also counts.
pub fn classify(content_type: Option<&str>, target: &Url) -> Classification {
    if content_type.is_some_and(is_playlist_content_type) || has_playlist_extension(target) {
        Classification::Playlist
    } else {
        Classification::Binary
    }
}

fn is_playlist_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    PLAYLIST_CONTENT_TYPES.contains(&essence.as_str())
}

/// Whether the URL path names a playlist file, ignoring case and query.
pub fn has_playlist_extension(target: &Url) -> bool {
    target
        .path()
        .to_ascii_lowercase()
        .ends_with(PLAYLIST_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_playlist_content_type() {
        let target = url("https://cdn.example.com/live/stream");
        assert_eq!(
            classify(Some("application/vnd.apple.mpegurl"), &target),
            Classification::Playlist
        );
        assert_eq!(
            classify(Some("Application/X-MpegURL; charset=utf-8"), &target),
            Classification::Playlist
        );
        assert_eq!(classify(Some("audio/mpegurl"), &target), Classification::Playlist);
    }

    #[test]
    fn test_extension_fallback_for_mislabelled_playlist() {
        let target = url("https://cdn.example.com/live/index.m3u8");
        assert_eq!(classify(Some("text/plain"), &target), Classification::Playlist);
        assert_eq!(classify(None, &target), Classification::Playlist);
    }

    #[test]
    fn test_extension_ignores_query_and_case() {
        assert_eq!(
            classify(None, &url("https://cdn.example.com/INDEX.M3U8?token=a.ts")),
            Classification::Playlist
        );
        assert_eq!(
            classify(None, &url("https://cdn.example.com/seg.ts?next=x.m3u8")),
            Classification::Binary
        );
    }

    #[test]
    fn test_segments_and_keys_are_binary() {
        assert_eq!(
            classify(Some("video/mp2t"), &url("https://cdn.example.com/seg_001.ts")),
            Classification::Binary
        );
        assert_eq!(
            classify(
                Some("application/octet-stream"),
                &url("https://cdn.example.com/key.bin")
            ),
            Classification::Binary
        );
        assert_eq!(
            classify(None, &url("https://cdn.example.com/init.mp4")),
            Classification::Binary
        );
    }
}

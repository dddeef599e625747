//! Playlist URL rewriting
//!
//! Rewrites every fetchable reference in an M3U8 document so that it routes
//! back through the relay's `/proxy` endpoint:
//!
//! - **URI lines** (segments, variant playlists) are replaced wholesale
//! - **`URI="..."` attributes** inside tags (`EXT-X-KEY`, `EXT-X-MAP`,
//!   `EXT-X-MEDIA`, `EXT-X-PART`, ...) have only their quoted value replaced
//! - **Everything else** (blank lines, tags without a URI attribute, line
//!   terminators) is copied byte-for-byte
//!
//! The functions here are pure: no I/O, same input gives the same output.

use std::borrow::Cow;
use tracing::debug;
use url::Url;

/// Path of the relay endpoint that rewritten URLs point at
pub const PROXY_PATH: &str = "/proxy";

const URI_MARKER: &str = "URI=\"";

const BOM: char = '\u{feff}';

/// Rewrite a playlist fetched from `fetch_url` so that all references go
/// through the relay at `proxy_base` (scheme + host, e.g. `http://host:5001`).
///
/// Line order and line terminators (`\n` or `\r\n`) are preserved, as is a
/// leading byte order mark. A line whose reference cannot be resolved is
/// emitted unchanged rather than failing the whole document.
pub fn rewrite_playlist(content: &str, fetch_url: &Url, proxy_base: &str) -> String {
    let base = directory_base(fetch_url);
    let proxy_base = proxy_base.trim_end_matches('/');

    let mut result = String::with_capacity(content.len() + content.len() / 2);
    let content = match content.strip_prefix(BOM) {
        Some(rest) => {
            result.push(BOM);
            rest
        }
        None => content,
    };
    for raw_line in content.split_inclusive('\n') {
        let (line, terminator) = split_terminator(raw_line);
        result.push_str(&rewrite_line(line, &base, proxy_base));
        result.push_str(terminator);
    }
    result
}

/// Rewrite a single line (without its terminator).
pub fn rewrite_line<'a>(line: &'a str, base: &Url, proxy_base: &str) -> Cow<'a, str> {
    if line.trim().is_empty() {
        return Cow::Borrowed(line);
    }

    if line.trim_start().starts_with('#') {
        return rewrite_uri_attributes(line, base, proxy_base);
    }

    let reference = line.trim();
    match resolve_reference(base, reference) {
        Some(resolved) => Cow::Owned(proxy_url(proxy_base, &resolved)),
        None => {
            debug!("Leaving unresolvable reference untouched: {}", reference);
            Cow::Borrowed(line)
        }
    }
}

/// Replace the value of every `URI="..."` attribute in a tag line.
///
/// Attributes are handled left to right, each independently. An empty value
/// or an unresolvable one is kept as-is; an unterminated quote stops the scan
/// and the remainder of the line is copied verbatim.
pub fn rewrite_uri_attributes<'a>(line: &'a str, base: &Url, proxy_base: &str) -> Cow<'a, str> {
    if !line.contains(URI_MARKER) {
        return Cow::Borrowed(line);
    }

    let mut result = String::with_capacity(line.len() + 128);
    let mut rest = line;

    while let Some(marker_pos) = rest.find(URI_MARKER) {
        let value_start = marker_pos + URI_MARKER.len();
        let Some(value_len) = rest[value_start..].find('"') else {
            debug!("Unterminated URI attribute, keeping tail verbatim: {}", line);
            break;
        };
        let value = &rest[value_start..value_start + value_len];

        result.push_str(&rest[..value_start]);
        match resolve_reference(base, value) {
            Some(resolved) if !value.is_empty() => {
                result.push_str(&proxy_url(proxy_base, &resolved));
            }
            _ => result.push_str(value),
        }
        result.push('"');

        rest = &rest[value_start + value_len + 1..];
    }

    result.push_str(rest);
    Cow::Owned(result)
}

/// Resolve a playlist reference against the playlist's directory.
///
/// A reference that already carries a scheme is returned unchanged, so
/// absolute CDN links are never re-joined. Returns `None` when the reference
/// cannot be turned into a URL.
pub fn resolve_reference(base: &Url, reference: &str) -> Option<String> {
    if Url::parse(reference).is_ok() {
        return Some(reference.to_string());
    }
    base.join(reference).ok().map(String::from)
}

/// Wrap an absolute URL in a relay URL.
///
/// The whole target is percent-encoded into the `url` query parameter,
/// including `:`, `/`, `?`, `&` and `=`, so decoding the parameter yields the
/// target exactly.
pub fn proxy_url(proxy_base: &str, target: &str) -> String {
    format!(
        "{}{}?url={}",
        proxy_base.trim_end_matches('/'),
        PROXY_PATH,
        urlencoding::encode(target)
    )
}

/// Directory of a resource URL: everything up to and including the last `/`
/// of the path, with query and fragment dropped.
pub fn directory_base(url: &Url) -> Url {
    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);

    if let Some(idx) = base.path().rfind('/') {
        let dir = base.path()[..=idx].to_string();
        base.set_path(&dir);
    }
    base
}

/// Split a raw line into its content and its terminator (`""`, `"\n"` or `"\r\n"`).
fn split_terminator(raw: &str) -> (&str, &str) {
    if let Some(line) = raw.strip_suffix("\r\n") {
        (line, &raw[line.len()..])
    } else if let Some(line) = raw.strip_suffix('\n') {
        (line, &raw[line.len()..])
    } else {
        (raw, "")
    }
}

// -- Tests -------------------------------------------------------------------

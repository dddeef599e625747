use crate::error::RelayError;
use url::Url;

/// Validate the `url` query parameter of a relay request.
///
/// Accepts only absolute `http://` and `https://` URLs that name a host.
/// Nothing is fetched when this fails.
///
/// # Errors
/// - [`RelayError::MissingUrl`] when the parameter is absent or blank
/// - [`RelayError::InvalidUrl`] for relative URLs, unparsable input,
///   non-HTTP(S) schemes or a missing host
pub fn validate_target_url(raw: Option<&str>) -> Result<Url, RelayError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or(RelayError::MissingUrl)?;

    let parsed = Url::parse(raw).map_err(|e| RelayError::InvalidUrl(format!("{raw} ({e})")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(RelayError::InvalidUrl(format!(
                "{raw} (scheme '{scheme}' not supported, only http/https)"
            )));
        }
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(RelayError::InvalidUrl(format!("{raw} (no host)"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter() {
        assert!(matches!(validate_target_url(None), Err(RelayError::MissingUrl)));
        assert!(matches!(validate_target_url(Some("")), Err(RelayError::MissingUrl)));
        assert!(matches!(validate_target_url(Some("   ")), Err(RelayError::MissingUrl)));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            validate_target_url(Some("not-a-url")),
            Err(RelayError::InvalidUrl(_))
        ));
        assert!(validate_target_url(Some("://missing-scheme")).is_err());
    }

    #[test]
    fn test_rejects_relative() {
        assert!(validate_target_url(Some("/videos/index.m3u8")).is_err());
        assert!(validate_target_url(Some("cdn.example.com/stream.m3u8")).is_err());
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(validate_target_url(Some("ftp://cdn.example.com/file.ts")).is_err());
        assert!(validate_target_url(Some("file:///etc/passwd")).is_err());
        assert!(validate_target_url(Some("data:text/plain,hello")).is_err());
    }

    #[test]
    fn test_accepts_http_and_https() {
        let url = validate_target_url(Some("https://cdn.example.com/live/index.m3u8?token=abc")).unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
        assert_eq!(url.query(), Some("token=abc"));

        assert!(validate_target_url(Some("http://127.0.0.1:8080/seg.ts")).is_ok());
        assert!(validate_target_url(Some("http://[::1]:8080/seg.ts")).is_ok());
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        assert!(validate_target_url(Some("  https://cdn.example.com/a.ts\n")).is_ok());
    }

    #[test]
    fn test_invalid_message_names_input() {
        let err = validate_target_url(Some("not-a-url")).unwrap_err();
        assert!(err.to_string().starts_with("Invalid URL: not-a-url"));
    }
}

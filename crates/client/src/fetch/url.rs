//! URL canonicalization and construction.

/// Error type for URL handling failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a URL string before it is requested.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an http or https scheme
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Append percent-encoded path segments to `base`.
///
/// User-supplied values such as park references or callsigns go through
/// here so that `/`, `?` and `#` in them cannot change the request.
pub fn with_path_segments<'a>(
    base: &str, segments: impl IntoIterator<Item = &'a str>,
) -> Result<url::Url, UrlError> {
    let mut url = canonicalize(base)?;
    url.path_segments_mut()
        .map_err(|_| UrlError::InvalidUrl(format!("{base} cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://api.pota.app/park/US-8081").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("api.pota.app"));
    }

    #[test]
    fn test_canonicalize_requires_scheme() {
        let result = canonicalize("www.hamqsl.com/solar101pic.php");
        assert!(matches!(result, Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_canonicalize_lowercase_host_and_fragment() {
        let url = canonicalize("  https://PROP.KC2G.com/renders#top ").unwrap();
        assert_eq!(url.as_str(), "https://prop.kc2g.com/renders");
    }

    #[test]
    fn test_canonicalize_preserve_query() {
        let url = canonicalize("https://api.pota.app/park/activations/US-8081?count=5").unwrap();
        assert_eq!(url.query(), Some("count=5"));
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize(""), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_with_path_segments_encodes() {
        let url = with_path_segments("https://api.pota.app/stats/user/", ["W1AW/P"]).unwrap();
        assert_eq!(url.as_str(), "https://api.pota.app/stats/user/W1AW%2FP");

        let url = with_path_segments("https://api.pota.app/park", ["stats", "US-8081"]).unwrap();
        assert_eq!(url.as_str(), "https://api.pota.app/park/stats/US-8081");
    }
}

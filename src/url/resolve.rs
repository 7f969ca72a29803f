//! Link resolution
//!
//! Turns hrefs from listing pages into absolute site URLs and decides which of
//! them are content pages.

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses an absolute http(s) URL
///
/// # Examples
///
/// ```
/// use learn_ingest::url::parse_site_url;
///
/// assert!(parse_site_url("https://learn.example.com/").is_ok());
/// assert!(parse_site_url("mailto:someone@example.com").is_err());
/// ```
pub fn parse_site_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    Ok(url)
}

/// Resolves a link href against the site origin
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// The fragment is dropped from the resolved URL so that anchors within one
/// article collapse onto the same page.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }

    absolute_url.set_fragment(None);
    Some(absolute_url)
}

/// Checks whether a URL is on the site origin and under one of the content prefixes
pub fn is_content_path(url: &Url, base_url: &Url, prefixes: &[String]) -> bool {
    if url.origin() != base_url.origin() {
        return false;
    }

    let path = url.path();
    prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

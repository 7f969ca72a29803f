//! Topic paths derived from article URL segments

use url::Url;

/// Derives the topic path of an article from its URL
///
/// Every non-empty path segment is kept in order, except navigational segments
/// named in `skip` (compared case-insensitively). Unparseable URLs yield no topics.
///
/// # Examples
///
/// ```
/// use learn_ingest::url::topic_segments;
///
/// let topics = topic_segments(
///     "https://example.com/learn/python/basics/",
///     &["learn".to_string()],
/// );
/// assert_eq!(topics, vec!["python", "basics"]);
/// ```
pub fn topic_segments(url_str: &str, skip: &[String]) -> Vec<String> {
    let url = match Url::parse(url_str) {
        Ok(url) => url,
        Err(_) => return Vec::new(),
    };

    let segments = match url.path_segments() {
        Some(segments) => segments,
        None => return Vec::new(),
    };

    segments
        .filter(|segment| !segment.is_empty())
        .filter(|segment| !skip.iter().any(|s| s.eq_ignore_ascii_case(segment)))
        .map(|segment| segment.to_string())
        .collect()
}

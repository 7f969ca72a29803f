//! URL handling module for learn-ingest
//!
//! This module resolves hrefs found on listing pages, decides whether a link points
//! at a content page, and derives topic paths from article URLs.

mod resolve;
mod segments;

pub use resolve::{is_content_path, parse_site_url, resolve_link};
pub use segments::topic_segments;

//! URL discovery
//!
//! Expands a target's listing page into the content pages it links to. Discovery
//! never fails a run: if the listing cannot be fetched or parsed, the target is
//! crawled as just its root URL.

use crate::config::SiteConfig;
use crate::crawler::fetcher::PageFetcher;
use crate::url::{is_content_path, parse_site_url, resolve_link};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Lists the content pages reachable from `root`, root first, at most `cap` URLs
///
/// Links are resolved against the site's base URL, kept only when their path
/// starts with one of the content prefixes, and deduplicated in first-seen order.
pub async fn discover(fetcher: &PageFetcher, site: &SiteConfig, root: &str, cap: usize) -> Vec<String> {
    let page = fetcher.fetch(root).await;

    let body = match page.body() {
        Some(body) => body,
        None => {
            tracing::warn!(
                "Discovery fetch failed for {}: {}; crawling root only",
                root,
                page.error_message().unwrap_or_default()
            );
            return vec![root.to_string()];
        }
    };

    let base_url = match parse_site_url(&site.base_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Invalid site base URL {}: {}; crawling root only", site.base_url, e);
            return vec![root.to_string()];
        }
    };

    let links = match extract_content_links(body, &base_url, &site.content_prefixes) {
        Ok(links) => links,
        Err(e) => {
            tracing::warn!("Failed to parse listing {}: {}; crawling root only", root, e);
            return vec![root.to_string()];
        }
    };

    let urls = collect_urls(root, links, cap);
    tracing::info!("Discovered {} URLs from {}", urls.len(), root);
    urls
}

/// Extracts every content link of a listing page, in document order
fn extract_content_links(html: &str, base_url: &Url, prefixes: &[String]) -> Result<Vec<Url>, String> {
    let document = Html::parse_document(html);
    let a_selector = Selector::parse("a[href]").map_err(|e| e.to_string())?;

    let links = document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .filter(|url| is_content_path(url, base_url, prefixes))
        .collect();

    Ok(links)
}

/// Puts the root first, drops duplicates and truncates to `cap`
fn collect_urls(root: &str, links: Vec<Url>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = vec![root.to_string()];

    seen.insert(root.to_string());
    if let Ok(parsed) = Url::parse(root) {
        seen.insert(parsed.to_string());
    }

    for link in links {
        if urls.len() >= cap {
            break;
        }
        let link = link.to_string();
        if seen.insert(link.clone()) {
            urls.push(link);
        }
    }

    urls.truncate(cap.max(1));
    urls
}

use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for learn-ingest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub site: SiteConfig,
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of pages fetched concurrently within one window
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Pause between consecutive windows (milliseconds)
    #[serde(rename = "batch-delay-ms", default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Maximum number of URLs discovered per target, root included
    #[serde(rename = "max-urls", default = "default_max_urls")]
    pub max_urls: usize,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Retry budget recorded on each job
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,
}

impl CrawlerConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            batch_delay_ms: default_batch_delay_ms(),
            max_urls: default_max_urls(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_concurrency() -> u32 {
    3
}

fn default_batch_delay_ms() -> u64 {
    1000
}

fn default_max_urls() -> usize {
    50
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Description of the crawled site and how its pages are laid out
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Source name recorded alongside every article
    pub name: String,

    /// Origin that relative links are resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path prefixes that mark a link as a content page
    #[serde(rename = "content-prefixes")]
    pub content_prefixes: Vec<String>,

    /// Navigational path segments left out of topic paths
    #[serde(rename = "skip-segments", default = "default_skip_segments")]
    pub skip_segments: Vec<String>,

    /// Candidate content containers, tried in order
    #[serde(rename = "content-selectors", default = "default_content_selectors")]
    pub content_selectors: Vec<String>,

    /// Language tag for code blocks without a `language-*` class
    #[serde(rename = "default-language", default = "default_language")]
    pub default_language: String,
}

fn default_skip_segments() -> Vec<String> {
    vec!["learn".to_string()]
}

fn default_content_selectors() -> Vec<String> {
    [
        "div.content",
        "#main-column",
        "div[data-main-column]",
        ".module-unit-content",
        "article",
        "main",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_language() -> String {
    "text".to_string()
}

/// Kind of listing page a target points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Certification,
    Topic,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Certification => "certification",
            Self::Topic => "topic",
        }
    }
}

/// A root listing page to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct TargetEntry {
    /// Identity label, stored as the article category
    pub slug: String,

    /// Display title
    pub title: String,

    /// Root listing page URL
    pub url: String,

    pub kind: TargetKind,
}

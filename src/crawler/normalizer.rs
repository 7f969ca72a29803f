//! Content normalizer
//!
//! Turns a fetched tutorial page into a [`NormalizedArticle`]:
//! - title from the first `<h1>`, else `<title>`
//! - body text from the first matching content container
//! - code snippets from `<pre><code>` blocks, or bare `<pre>` when a page has none
//! - a markdown rendering of the content container
//! - keywords, topic path, word and character counts
//!
//! Markdown is rendered in three grouped passes over the container: all headings,
//! then all paragraphs, then all code blocks. It is not a single walk in document
//! order, and stored renderings depend on that layout staying fixed.

use crate::config::SiteConfig;
use crate::crawler::fetcher::FetchedPage;
use crate::url::topic_segments;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Snippets shorter than this (in characters, trimmed) are dropped
pub const MIN_SNIPPET_LEN: usize = 10;

/// Tokens shorter than this never become keywords
pub const MIN_KEYWORD_LEN: usize = 4;

/// Number of keywords kept per article
pub const KEYWORD_LIMIT: usize = 10;

const CODE_BLOCK_SELECTOR: &str = "pre code";
const HEADING_SELECTOR: &str = "h1, h2, h3, h4";

/// A code block with its detected language
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeSnippet {
    pub language: String,
    pub code: String,
}

/// Structured article derived from one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedArticle {
    pub url: String,
    pub title: String,
    /// Plain text of the content container
    pub content: String,
    pub markdown: String,
    pub code_snippets: Vec<CodeSnippet>,
    pub keywords: Vec<String>,
    pub topics: Vec<String>,
    /// Whitespace-separated tokens of `content`
    pub word_count: usize,
    /// Characters of `content`
    pub char_count: usize,
}

/// A page that could not be turned into an article
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to extract {url}: {message}")]
pub struct ExtractionFailure {
    pub url: String,
    pub message: String,
}

impl ExtractionFailure {
    fn new(url: &str, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// The zeroed article recorded for a page that could not be normalized
    pub fn to_article(&self) -> NormalizedArticle {
        NormalizedArticle {
            url: self.url.clone(),
            title: String::new(),
            content: String::new(),
            markdown: String::new(),
            code_snippets: Vec::new(),
            keywords: Vec::new(),
            topics: Vec::new(),
            word_count: 0,
            char_count: 0,
        }
    }
}

/// Normalizes a fetched page into an article
///
/// Unsuccessful fetches, invalid selectors and pages without article content all
/// come back as an [`ExtractionFailure`].
///
/// # Example
///
/// ```no_run
/// use learn_ingest::config::SiteConfig;
/// use learn_ingest::crawler::{normalize, FetchOutcome, FetchedPage};
///
/// # fn example(site: &SiteConfig) {
/// let page = FetchedPage {
///     url: "https://learn.example.com/en-us/training/modules/intro/".to_string(),
///     outcome: FetchOutcome::Success {
///         status_code: 200,
///         body: "<main><h1>Intro</h1><p>Welcome to the module.</p></main>".to_string(),
///     },
/// };
/// let article = normalize(&page, site).unwrap();
/// assert_eq!(article.title, "Intro");
/// # }
/// ```
pub fn normalize(page: &FetchedPage, site: &SiteConfig) -> Result<NormalizedArticle, ExtractionFailure> {
    let body = page.body().ok_or_else(|| {
        ExtractionFailure::new(
            &page.url,
            page.error_message()
                .unwrap_or_else(|| "Page has no body".to_string()),
        )
    })?;

    extract_article(&page.url, body, site).map_err(|message| ExtractionFailure::new(&page.url, message))
}

fn extract_article(url: &str, html: &str, site: &SiteConfig) -> Result<NormalizedArticle, String> {
    let document = Html::parse_document(html);

    let title = extract_title(&document)?;

    let container = find_content_container(&document, &site.content_selectors)?
        .ok_or_else(|| "No content container found".to_string())?;

    let content = container.text().collect::<String>().trim().to_string();
    if content.is_empty() {
        return Err("Content container is empty".to_string());
    }

    let code_snippets = extract_code_snippets(&document, &site.default_language)?;
    let markdown = render_markdown(container, &site.default_language)?;
    let keywords = extract_keywords(&content, KEYWORD_LIMIT);
    let topics = topic_segments(url, &site.skip_segments);
    let word_count = count_words(&content);
    let char_count = content.chars().count();

    Ok(NormalizedArticle {
        url: url.to_string(),
        title,
        content,
        markdown,
        code_snippets,
        keywords,
        topics,
        word_count,
        char_count,
    })
}

fn selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("Invalid selector '{}': {}", css, e))
}

/// Text of an element with whitespace runs collapsed
fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_title(document: &Html) -> Result<String, String> {
    for css in ["h1", "title"] {
        let title = document
            .select(&selector(css)?)
            .next()
            .map(collapsed_text)
            .filter(|s| !s.is_empty());

        if let Some(title) = title {
            return Ok(title);
        }
    }

    Ok(String::new())
}

fn find_content_container<'a>(
    document: &'a Html,
    candidates: &[String],
) -> Result<Option<ElementRef<'a>>, String> {
    for css in candidates {
        if let Some(element) = document.select(&selector(css)?).next() {
            return Ok(Some(element));
        }
    }
    Ok(None)
}

/// Reads the language from a `language-<name>` class
fn code_language(element: ElementRef<'_>, default_language: &str) -> String {
    element
        .value()
        .classes()
        .find_map(|class| class.strip_prefix("language-"))
        .filter(|lang| !lang.is_empty())
        .unwrap_or(default_language)
        .to_string()
}

/// `pre code` blocks under `scope`, or bare `pre` blocks when there are none
fn code_blocks<'a>(scope: ElementRef<'a>) -> Result<Vec<ElementRef<'a>>, String> {
    let blocks: Vec<_> = scope.select(&selector(CODE_BLOCK_SELECTOR)?).collect();
    if !blocks.is_empty() {
        return Ok(blocks);
    }
    Ok(scope.select(&selector("pre")?).collect())
}

fn extract_code_snippets(document: &Html, default_language: &str) -> Result<Vec<CodeSnippet>, String> {
    let snippets = code_blocks(document.root_element())?
        .into_iter()
        .filter_map(|element| {
            let code = element.text().collect::<String>().trim().to_string();
            if code.chars().count() < MIN_SNIPPET_LEN {
                return None;
            }
            Some(CodeSnippet {
                language: code_language(element, default_language),
                code,
            })
        })
        .collect();

    Ok(snippets)
}

fn heading_level(element: ElementRef<'_>) -> usize {
    match element.value().name() {
        "h1" => 1,
        "h2" => 2,
        "h3" => 3,
        _ => 4,
    }
}

/// Renders the container as markdown in grouped passes
fn render_markdown(container: ElementRef<'_>, default_language: &str) -> Result<String, String> {
    let mut blocks = Vec::new();

    for heading in container.select(&selector(HEADING_SELECTOR)?) {
        let text = collapsed_text(heading);
        if !text.is_empty() {
            blocks.push(format!("{} {}", "#".repeat(heading_level(heading)), text));
        }
    }

    for paragraph in container.select(&selector("p")?) {
        let text = collapsed_text(paragraph);
        if !text.is_empty() {
            blocks.push(text);
        }
    }

    for code in code_blocks(container)? {
        let source = code.text().collect::<String>();
        let source = source.trim_matches('\n');
        if !source.trim().is_empty() {
            blocks.push(format!(
                "```{}\n{}\n```",
                code_language(code, default_language),
                source
            ));
        }
    }

    Ok(blocks.join("\n\n"))
}

/// Most frequent tokens of `content`, ties broken by first occurrence
///
/// Content is lower-cased and split on anything that is not an ASCII letter,
/// digit or underscore; tokens shorter than [`MIN_KEYWORD_LEN`] are ignored.
pub fn extract_keywords(content: &str, limit: usize) -> Vec<String> {
    let lowered = content.to_lowercase();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for token in lowered.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_')) {
        if token.chars().count() < MIN_KEYWORD_LEN {
            continue;
        }
        match positions.get(token) {
            Some(&index) => counts[index].1 += 1,
            None => {
                positions.insert(token, counts.len());
                counts.push((token, 1));
            }
        }
    }

    // stable sort keeps first-occurrence order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(limit)
        .map(|(token, _)| token.to_string())
        .collect()
}

/// Counts whitespace-separated tokens
pub fn count_words(content: &str) -> usize {
    content.split_whitespace().count()
}

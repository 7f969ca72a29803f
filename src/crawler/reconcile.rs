//! Change detection and article writes
//!
//! An article is written only when its content fingerprint differs from the one
//! stored for the same URL, so re-crawling unchanged pages leaves the store alone.
//! Store failures are logged and reported as [`Reconciled::WriteFailed`]; they
//! never propagate.

use crate::crawler::normalizer::NormalizedArticle;
use crate::storage::{ArticleRecord, Storage};
use sha2::{Digest, Sha256};

/// Hex SHA-256 digest of an article's plain-text content
///
/// Only `content` feeds the digest; title and metadata changes alone never
/// trigger a rewrite.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// What happened to one article at the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// No record existed for the URL
    Inserted,
    /// The stored fingerprint differed
    Updated,
    /// The stored fingerprint matched; nothing written
    Unchanged,
    /// The store rejected the write
    WriteFailed(String),
}

impl Reconciled {
    pub fn written(&self) -> bool {
        matches!(self, Self::Inserted | Self::Updated)
    }
}

/// Writes `article` under `category` unless identical content is already stored
pub fn reconcile(
    storage: &mut dyn Storage,
    source_id: i64,
    article: NormalizedArticle,
    category: &str,
) -> Reconciled {
    let content_hash = fingerprint(&article.content);

    let existing = match storage.find_article(&article.url) {
        Ok(existing) => existing,
        Err(e) => {
            tracing::warn!("Lookup of {} failed, writing anyway: {}", article.url, e);
            None
        }
    };

    if let Some(stored) = &existing {
        if stored.content_hash == content_hash {
            tracing::debug!("Unchanged content for {}", article.url);
            return Reconciled::Unchanged;
        }
    }

    let url = article.url.clone();
    let record = ArticleRecord {
        article,
        content_hash,
        category: category.to_string(),
        source_id,
        processed: false,
    };

    match storage.upsert_article(&record) {
        Ok(()) if existing.is_some() => {
            tracing::debug!("Updated article {}", url);
            Reconciled::Updated
        }
        Ok(()) => {
            tracing::debug!("Inserted article {}", url);
            Reconciled::Inserted
        }
        Err(e) => {
            tracing::error!("Failed to store article {}: {}", url, e);
            Reconciled::WriteFailed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    fn article(url: &str, title: &str, content: &str) -> NormalizedArticle {
        NormalizedArticle {
            url: url.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            markdown: format!("# {}\n\n{}", title, content),
            code_snippets: Vec::new(),
            keywords: Vec::new(),
            topics: Vec::new(),
            word_count: content.split_whitespace().count(),
            char_count: content.chars().count(),
        }
    }

    fn storage_with_source() -> (SqliteStorage, i64) {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let source_id = storage.insert_source("Example", "https://x").unwrap();
        (storage, source_id)
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(fingerprint("same body"), fingerprint("same body"));
        assert_eq!(fingerprint("same body").len(), 64);
    }

    #[test]
    fn test_fingerprint_is_content_sensitive() {
        assert_ne!(fingerprint("body one"), fingerprint("body two"));
    }

    #[test]
    fn test_title_change_alone_keeps_fingerprint() {
        let a = article("https://x/a", "Old title", "Body");
        let b = article("https://x/a", "New title", "Body");
        assert_eq!(fingerprint(&a.content), fingerprint(&b.content));
    }

    #[test]
    fn test_title_only_change_is_skipped() {
        let (mut storage, source_id) = storage_with_source();

        let first = reconcile(&mut storage, source_id, article("https://x/a", "Old title", "Body"), "az-900");
        let second = reconcile(&mut storage, source_id, article("https://x/a", "New title", "Body"), "az-900");

        assert_eq!(first, Reconciled::Inserted);
        assert_eq!(second, Reconciled::Unchanged);
        assert_eq!(storage.count_articles().unwrap(), 1);
    }

    #[test]
    fn test_second_run_on_unchanged_content_is_a_no_op() {
        let (mut storage, source_id) = storage_with_source();

        let first = reconcile(&mut storage, source_id, article("https://x/a", "A", "Body"), "az-900");
        let second = reconcile(&mut storage, source_id, article("https://x/a", "A", "Body"), "az-900");

        assert_eq!(first, Reconciled::Inserted);
        assert_eq!(second, Reconciled::Unchanged);
        assert!(!second.written());
        assert_eq!(storage.count_articles().unwrap(), 1);
    }

    #[test]
    fn test_changed_content_is_rewritten() {
        let (mut storage, source_id) = storage_with_source();

        reconcile(&mut storage, source_id, article("https://x/a", "A", "Body"), "az-900");
        let outcome = reconcile(&mut storage, source_id, article("https://x/a", "A", "New body"), "az-900");

        assert_eq!(outcome, Reconciled::Updated);
        let stored = storage.find_article("https://x/a").unwrap().unwrap();
        assert_eq!(stored.content_hash, fingerprint("New body"));
        assert!(!stored.processed);
    }

    #[test]
    fn test_write_failure_is_reported_not_raised() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        // no source row, so the foreign key rejects the insert
        let outcome = reconcile(&mut storage, 42, article("https://x/a", "A", "Body"), "az-900");

        assert!(matches!(outcome, Reconciled::WriteFailed(_)));
        assert!(!outcome.written());
    }
}

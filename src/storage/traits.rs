//! Storage traits and error types
//!
//! This module defines the record-store interface the pipeline writes through and
//! its error type.

use crate::state::CrawlJob;
use crate::storage::{ArticleRecord, SourceRecord, StoredArticle};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Job not found: {0}")]
    JobNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for record store implementations
///
/// Every call is treated as a possibly-failing remote operation. Callers decide
/// which failures are fatal: source and job creation abort a run, everything
/// else is logged and swallowed.
pub trait Storage {
    // ===== Sources =====

    /// Finds the content source with the given name
    fn find_source(&self, name: &str) -> StorageResult<Option<SourceRecord>>;

    /// Inserts a content source and returns its ID
    fn insert_source(&mut self, name: &str, base_url: &str) -> StorageResult<i64>;

    // ===== Articles =====

    /// Finds the current article stored for a URL
    fn find_article(&self, url: &str) -> StorageResult<Option<StoredArticle>>;

    /// Inserts or replaces the article keyed by its URL
    fn upsert_article(&mut self, record: &ArticleRecord) -> StorageResult<()>;

    /// Counts all stored articles
    fn count_articles(&self) -> StorageResult<u64>;

    /// Counts articles still flagged for further processing
    fn count_unprocessed_articles(&self) -> StorageResult<u64>;

    /// Article counts per category, largest first
    fn count_articles_by_category(&self) -> StorageResult<Vec<(String, u64)>>;

    // ===== Jobs =====

    /// Persists a new job and returns its ID
    fn insert_job(&mut self, job: &CrawlJob) -> StorageResult<i64>;

    /// Gets a job by ID
    fn get_job(&self, job_id: i64) -> StorageResult<Option<CrawlJob>>;

    /// Overwrites the mutable fields of an existing job
    fn update_job(&mut self, job: &CrawlJob) -> StorageResult<()>;

    /// Most recently scheduled jobs, newest first
    fn recent_jobs(&self, limit: usize) -> StorageResult<Vec<CrawlJob>>;
}

//! Storage module for persisting ingestion data
//!
//! This module handles all database operations for the pipeline, including:
//! - SQLite database initialization and schema management
//! - Article upserts keyed by source URL, with content fingerprints
//! - Crawl job records for progress polling
//! - Content source registration

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::crawler::NormalizedArticle;
use crate::IngestError;
use std::sync::{Arc, Mutex, MutexGuard};

/// Store handle shared between the scheduler and its in-flight item tasks
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;

/// Wraps a concrete store into a [`SharedStorage`]
pub fn shared<S: Storage + Send + 'static>(storage: S) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Locks the shared store, mapping a poisoned lock to an error
pub fn lock(storage: &SharedStorage) -> Result<MutexGuard<'_, dyn Storage + Send + 'static>, IngestError> {
    storage.lock().map_err(|_| IngestError::LockPoisoned)
}

/// A registered content source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub id: i64,
    pub name: String,
    pub base_url: String,
}

/// The fields of a stored article needed for change detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArticle {
    pub url: String,
    pub content_hash: String,
    pub processed: bool,
}

/// Everything written for one article
#[derive(Debug, Clone)]
pub struct ArticleRecord {
    pub article: NormalizedArticle,
    pub content_hash: String,
    pub category: String,
    pub source_id: i64,
    /// False until downstream processing picks the article up
    pub processed: bool,
}

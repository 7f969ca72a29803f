//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::{CrawlJob, JobStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{ArticleRecord, SourceRecord, StoredArticle};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const JOB_COLUMNS: &str = "id, status, total_urls, urls_processed, urls_failed, items_written,
     progress, scheduled_at, started_at, completed_at, last_error, retry_count, max_retries";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path` and initializes the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_timestamp(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_timestamp(idx, &s)).transpose()
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<CrawlJob> {
    let status_raw: String = row.get(1)?;
    let status = JobStatus::from_db_string(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Text,
            format!("unknown job status '{}'", status_raw).into(),
        )
    })?;

    Ok(CrawlJob {
        id: row.get(0)?,
        status,
        total_urls: row.get::<_, i64>(2)? as u64,
        urls_processed: row.get::<_, i64>(3)? as u64,
        urls_failed: row.get::<_, i64>(4)? as u64,
        items_written: row.get::<_, i64>(5)? as u64,
        progress: row.get(6)?,
        scheduled_at: parse_timestamp(7, &row.get::<_, String>(7)?)?,
        started_at: parse_optional_timestamp(8, row.get(8)?)?,
        completed_at: parse_optional_timestamp(9, row.get(9)?)?,
        last_error: row.get(10)?,
        retry_count: row.get(11)?,
        max_retries: row.get(12)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Sources =====

    fn find_source(&self, name: &str) -> StorageResult<Option<SourceRecord>> {
        let source = self
            .conn
            .query_row(
                "SELECT id, name, base_url FROM sources WHERE name = ?1",
                params![name],
                |row| {
                    Ok(SourceRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        base_url: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(source)
    }

    fn insert_source(&mut self, name: &str, base_url: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sources (name, base_url, created_at) VALUES (?1, ?2, ?3)",
            params![name, base_url, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ===== Articles =====

    fn find_article(&self, url: &str) -> StorageResult<Option<StoredArticle>> {
        let article = self
            .conn
            .query_row(
                "SELECT url, content_hash, processed FROM articles WHERE url = ?1",
                params![url],
                |row| {
                    Ok(StoredArticle {
                        url: row.get(0)?,
                        content_hash: row.get(1)?,
                        processed: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(article)
    }

    fn upsert_article(&mut self, record: &ArticleRecord) -> StorageResult<()> {
        let article = &record.article;
        let now = Utc::now().to_rfc3339();
        let code_snippets = serde_json::to_string(&article.code_snippets)?;
        let keywords = serde_json::to_string(&article.keywords)?;
        let topics = serde_json::to_string(&article.topics)?;

        self.conn.execute(
            "INSERT INTO articles (url, source_id, category, title, content, markdown,
                 code_snippets, keywords, topics, word_count, char_count, content_hash,
                 processed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
             ON CONFLICT(url) DO UPDATE SET
                 source_id = excluded.source_id,
                 category = excluded.category,
                 title = excluded.title,
                 content = excluded.content,
                 markdown = excluded.markdown,
                 code_snippets = excluded.code_snippets,
                 keywords = excluded.keywords,
                 topics = excluded.topics,
                 word_count = excluded.word_count,
                 char_count = excluded.char_count,
                 content_hash = excluded.content_hash,
                 processed = excluded.processed,
                 updated_at = excluded.updated_at",
            params![
                article.url,
                record.source_id,
                record.category,
                article.title,
                article.content,
                article.markdown,
                code_snippets,
                keywords,
                topics,
                article.word_count as i64,
                article.char_count as i64,
                record.content_hash,
                record.processed,
                now
            ],
        )?;
        Ok(())
    }

    fn count_articles(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_unprocessed_articles(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE processed = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_articles_by_category(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) AS n FROM articles
             GROUP BY category ORDER BY n DESC, category ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    // ===== Jobs =====

    fn insert_job(&mut self, job: &CrawlJob) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO crawl_jobs (status, total_urls, urls_processed, urls_failed,
                 items_written, progress, scheduled_at, started_at, completed_at,
                 last_error, retry_count, max_retries)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                job.status.to_db_string(),
                job.total_urls as i64,
                job.urls_processed as i64,
                job.urls_failed as i64,
                job.items_written as i64,
                job.progress,
                format_timestamp(&job.scheduled_at),
                job.started_at.as_ref().map(format_timestamp),
                job.completed_at.as_ref().map(format_timestamp),
                job.last_error,
                job.retry_count,
                job.max_retries
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_job(&self, job_id: i64) -> StorageResult<Option<CrawlJob>> {
        let job = self
            .conn
            .query_row(
                &format!("SELECT {} FROM crawl_jobs WHERE id = ?1", JOB_COLUMNS),
                params![job_id],
                job_from_row,
            )
            .optional()?;

        Ok(job)
    }

    fn update_job(&mut self, job: &CrawlJob) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE crawl_jobs SET status = ?1, total_urls = ?2, urls_processed = ?3,
                 urls_failed = ?4, items_written = ?5, progress = ?6, started_at = ?7,
                 completed_at = ?8, last_error = ?9, retry_count = ?10, max_retries = ?11
             WHERE id = ?12",
            params![
                job.status.to_db_string(),
                job.total_urls as i64,
                job.urls_processed as i64,
                job.urls_failed as i64,
                job.items_written as i64,
                job.progress,
                job.started_at.as_ref().map(format_timestamp),
                job.completed_at.as_ref().map(format_timestamp),
                job.last_error,
                job.retry_count,
                job.max_retries,
                job.id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::JobNotFound(job.id));
        }
        Ok(())
    }

    fn recent_jobs(&self, limit: usize) -> StorageResult<Vec<CrawlJob>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM crawl_jobs ORDER BY id DESC LIMIT ?1",
            JOB_COLUMNS
        ))?;

        let rows = stmt.query_map(params![limit as i64], job_from_row)?;

        let mut jobs = Vec::new();
        for row in rows {
            jobs.push(row?);
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{CodeSnippet, NormalizedArticle};

    fn sample_record(source_id: i64, url: &str, hash: &str) -> ArticleRecord {
        ArticleRecord {
            article: NormalizedArticle {
                url: url.to_string(),
                title: "Intro".to_string(),
                content: "Some body text".to_string(),
                markdown: "# Intro\n\nSome body text".to_string(),
                code_snippets: vec![CodeSnippet {
                    language: "python".to_string(),
                    code: "print('hello world')".to_string(),
                }],
                keywords: vec!["some".to_string(), "body".to_string(), "text".to_string()],
                topics: vec!["modules".to_string(), "intro".to_string()],
                word_count: 3,
                char_count: 14,
            },
            content_hash: hash.to_string(),
            category: "az-900".to_string(),
            source_id,
            processed: false,
        }
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteStorage::new_in_memory().is_ok());
    }

    #[test]
    fn test_insert_and_find_source() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.find_source("Example").unwrap().is_none());

        let id = storage.insert_source("Example", "https://learn.example.com").unwrap();
        let source = storage.find_source("Example").unwrap().unwrap();
        assert_eq!(source.id, id);
        assert_eq!(source.base_url, "https://learn.example.com");
    }

    #[test]
    fn test_duplicate_source_rejected() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert_source("Example", "https://a").unwrap();
        assert!(storage.insert_source("Example", "https://b").is_err());
    }

    #[test]
    fn test_upsert_article_replaces_by_url() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let source_id = storage.insert_source("Example", "https://x").unwrap();

        storage
            .upsert_article(&sample_record(source_id, "https://x/a", "hash-1"))
            .unwrap();
        storage
            .upsert_article(&sample_record(source_id, "https://x/a", "hash-2"))
            .unwrap();

        assert_eq!(storage.count_articles().unwrap(), 1);
        let stored = storage.find_article("https://x/a").unwrap().unwrap();
        assert_eq!(stored.content_hash, "hash-2");
        assert!(!stored.processed);
    }

    #[test]
    fn test_article_counts() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let source_id = storage.insert_source("Example", "https://x").unwrap();

        storage
            .upsert_article(&sample_record(source_id, "https://x/a", "h"))
            .unwrap();
        let mut other = sample_record(source_id, "https://x/b", "h");
        other.category = "python".to_string();
        other.processed = true;
        storage.upsert_article(&other).unwrap();

        assert_eq!(storage.count_articles().unwrap(), 2);
        assert_eq!(storage.count_unprocessed_articles().unwrap(), 1);
        assert_eq!(
            storage.count_articles_by_category().unwrap(),
            vec![("az-900".to_string(), 1), ("python".to_string(), 1)]
        );
    }

    #[test]
    fn test_job_roundtrip() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut job = CrawlJob::pending(3);
        job.id = storage.insert_job(&job).unwrap();

        job.status = JobStatus::Running;
        job.total_urls = 4;
        job.urls_processed = 1;
        job.refresh_progress();
        job.started_at = Some(Utc::now());
        storage.update_job(&job).unwrap();

        let loaded = storage.get_job(job.id).unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Running);
        assert_eq!(loaded.total_urls, 4);
        assert_eq!(loaded.progress, 25.0);
        assert!(loaded.started_at.is_some());
        assert!(loaded.completed_at.is_none());
    }

    #[test]
    fn test_update_missing_job() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut job = CrawlJob::pending(0);
        job.id = 99;
        assert!(matches!(
            storage.update_job(&job),
            Err(StorageError::JobNotFound(99))
        ));
    }

    #[test]
    fn test_recent_jobs_newest_first() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let first = storage.insert_job(&CrawlJob::pending(1)).unwrap();
        let second = storage.insert_job(&CrawlJob::pending(1)).unwrap();

        let jobs = storage.recent_jobs(10).unwrap();
        assert_eq!(jobs.iter().map(|j| j.id).collect::<Vec<_>>(), vec![second, first]);
    }
}

//! Statistics generation from the content store
//!
//! This module provides functionality for extracting and displaying
//! ingestion statistics and job records from the storage layer.

use crate::crawler::JobSummary;
use crate::state::CrawlJob;
use crate::storage::Storage;

/// How many recent jobs `--stats` lists
pub const RECENT_JOB_LIMIT: usize = 5;

/// Ingestion statistics summary
#[derive(Debug, Clone)]
pub struct IngestStatistics {
    /// Total number of stored articles
    pub total_articles: u64,

    /// Articles still waiting for downstream processing
    pub unprocessed_articles: u64,

    /// Article counts per category, largest first
    pub articles_by_category: Vec<(String, u64)>,

    /// Most recently scheduled jobs, newest first
    pub recent_jobs: Vec<CrawlJob>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(IngestStatistics)` - Successfully loaded statistics
/// * `Err(IngestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> crate::Result<IngestStatistics> {
    Ok(IngestStatistics {
        total_articles: storage.count_articles()?,
        unprocessed_articles: storage.count_unprocessed_articles()?,
        articles_by_category: storage.count_articles_by_category()?,
        recent_jobs: storage.recent_jobs(RECENT_JOB_LIMIT)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &IngestStatistics) {
    println!("=== Ingestion Statistics ===\n");

    println!("Overview:");
    println!("  Total articles: {}", stats.total_articles);
    println!("  Awaiting processing: {}", stats.unprocessed_articles);
    println!();

    if !stats.articles_by_category.is_empty() {
        println!("Articles by Category:");
        for (category, count) in &stats.articles_by_category {
            let percentage = if stats.total_articles > 0 {
                (*count as f64 / stats.total_articles as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", category, count, percentage);
        }
        println!();
    }

    if stats.recent_jobs.is_empty() {
        println!("No crawl jobs recorded");
        return;
    }

    println!("Recent Jobs ({}):", stats.recent_jobs.len());
    for job in &stats.recent_jobs {
        println!(
            "  #{} {} - {}/{} URLs ({:.1}%), {} failed, {} written",
            job.id,
            job.status,
            job.urls_processed,
            job.total_urls,
            job.progress,
            job.urls_failed,
            job.items_written
        );
    }
}

/// Prints one job record in full
pub fn print_job(job: &CrawlJob) {
    println!("=== Crawl Job #{} ===\n", job.id);
    println!("  Status: {}", job.status);
    println!("  Progress: {:.1}%", job.progress);
    println!(
        "  URLs: {} processed of {} ({} succeeded, {} failed)",
        job.urls_processed,
        job.total_urls,
        job.urls_succeeded(),
        job.urls_failed
    );
    println!("  Articles written: {}", job.items_written);
    println!("  Scheduled: {}", job.scheduled_at.to_rfc3339());
    if let Some(started) = job.started_at {
        println!("  Started: {}", started.to_rfc3339());
    }
    if let Some(completed) = job.completed_at {
        println!("  Finished: {}", completed.to_rfc3339());
    }
    println!("  Retries: {}/{}", job.retry_count, job.max_retries);
    if let Some(error) = &job.last_error {
        println!("  Last error: {}", error);
    }
}

/// Prints the per-target and aggregate counts of a finished run
pub fn print_job_summary(summary: &JobSummary) {
    println!("=== Job #{} Summary ===\n", summary.job_id);
    for (slug, target) in &summary.targets {
        println!(
            "  {}: {}/{} succeeded, {} failed, {} written",
            slug, target.succeeded, target.total, target.failed, target.written
        );
    }
    println!();
    println!(
        "Total: {}/{} succeeded, {} failed, {} articles written",
        summary.total.succeeded, summary.total.total, summary.total.failed, summary.total.written
    );
}

//! Job state definitions for tracking crawl runs
//!
//! A job moves `Pending -> Running -> Completed | Failed` and never leaves a
//! terminal state.
use chrono::{DateTime, Utc};
use std::fmt;

/// Lifecycle status of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Created, nothing fetched yet
    Pending,

    /// Targets are being processed
    Running,

    /// Every target was processed, whether or not individual items failed
    Completed,

    /// An error outside per-item handling aborted the run
    Failed,
}

impl JobStatus {
    /// Returns true if no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    /// Converts the job status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a job status from a database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Run-level state of one crawl job
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlJob {
    pub id: i64,
    pub status: JobStatus,
    pub total_urls: u64,
    pub urls_processed: u64,
    pub urls_failed: u64,
    /// Articles inserted or updated in the store
    pub items_written: u64,
    pub progress: f64,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl CrawlJob {
    /// Creates a pending job that has not yet been persisted (id 0)
    pub fn pending(max_retries: u32) -> Self {
        Self {
            id: 0,
            status: JobStatus::Pending,
            total_urls: 0,
            urls_processed: 0,
            urls_failed: 0,
            items_written: 0,
            progress: 0.0,
            scheduled_at: Utc::now(),
            started_at: None,
            completed_at: None,
            last_error: None,
            retry_count: 0,
            max_retries,
        }
    }

    /// Items that completed without a fetch or extraction failure
    pub fn urls_succeeded(&self) -> u64 {
        self.urls_processed - self.urls_failed
    }

    /// Recomputes `progress` as `processed / total * 100`
    pub fn refresh_progress(&mut self) {
        self.progress = progress_percentage(self.urls_processed, self.total_urls);
    }
}

/// Percentage of `processed` over `total`; an empty run counts as done
pub fn progress_percentage(processed: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    processed as f64 * 100.0 / total as f64
}

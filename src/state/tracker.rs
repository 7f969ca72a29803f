//! Job progress tracker
//!
//! Owns the in-memory copy of a [`CrawlJob`] and writes it back to the store after
//! every change, so progress can be polled while a run is in flight. Creating or
//! loading a job is fatal when the store fails; later progress writes are logged
//! and the run carries on.

use crate::state::{CrawlJob, JobStatus};
use crate::storage::{lock, SharedStorage};
use crate::IngestError;
use chrono::Utc;

pub struct JobTracker {
    storage: SharedStorage,
    job: CrawlJob,
}

impl JobTracker {
    /// Persists a new pending job
    pub fn create(storage: SharedStorage, max_retries: u32) -> crate::Result<Self> {
        let mut job = CrawlJob::pending(max_retries);
        job.id = lock(&storage)?.insert_job(&job)?;
        tracing::info!("Created crawl job {}", job.id);
        Ok(Self { storage, job })
    }

    /// Loads a pending job so it can be run
    ///
    /// Jobs that already started or finished are rejected; a finished job has to be
    /// recreated rather than resumed.
    pub fn load(storage: SharedStorage, job_id: i64) -> crate::Result<Self> {
        let job = lock(&storage)?
            .get_job(job_id)?
            .ok_or(IngestError::JobNotFound(job_id))?;

        if job.status != JobStatus::Pending {
            return Err(IngestError::InvalidTransition {
                from: job.status,
                to: JobStatus::Running,
            });
        }

        Ok(Self { storage, job })
    }

    pub fn job(&self) -> &CrawlJob {
        &self.job
    }

    /// Moves the job to running with the discovered URL total
    pub fn start(&mut self, total_urls: u64) -> crate::Result<()> {
        self.transition(JobStatus::Running)?;
        self.job.started_at = Some(Utc::now());
        self.job.total_urls = total_urls;
        self.job.refresh_progress();
        self.persist();
        Ok(())
    }

    /// Counts one finished item and persists the new progress immediately
    pub fn record_item(&mut self, failed: bool, written: bool) {
        self.job.urls_processed += 1;
        if failed {
            self.job.urls_failed += 1;
        }
        if written {
            self.job.items_written += 1;
        }
        self.job.refresh_progress();

        tracing::debug!(
            "Job {} progress: {}/{} ({:.1}%)",
            self.job.id,
            self.job.urls_processed,
            self.job.total_urls,
            self.job.progress
        );
        self.persist();
    }

    /// Marks the job completed
    pub fn complete(&mut self) -> crate::Result<()> {
        self.transition(JobStatus::Completed)?;
        self.job.completed_at = Some(Utc::now());
        self.persist();
        Ok(())
    }

    /// Marks the job failed with the captured error message
    pub fn fail(&mut self, message: &str) -> crate::Result<()> {
        self.transition(JobStatus::Failed)?;
        self.job.completed_at = Some(Utc::now());
        self.job.last_error = Some(message.to_string());
        self.persist();
        Ok(())
    }

    fn transition(&mut self, next: JobStatus) -> crate::Result<()> {
        if !self.job.status.can_transition_to(next) {
            return Err(IngestError::InvalidTransition {
                from: self.job.status,
                to: next,
            });
        }
        tracing::info!("Job {}: {} -> {}", self.job.id, self.job.status, next);
        self.job.status = next;
        Ok(())
    }

    fn persist(&self) {
        let result = lock(&self.storage).and_then(|mut storage| {
            storage.update_job(&self.job).map_err(IngestError::from)
        });

        if let Err(e) = result {
            tracing::warn!("Failed to persist job {}: {}", self.job.id, e);
        }
    }
}

//! State module for tracking crawl jobs
//!
//! # Components
//!
//! - `JobStatus`: lifecycle of a crawl job (pending, running, completed, failed)
//! - `CrawlJob`: the persisted counters and timestamps of one run
//! - `JobTracker`: mutates a job as a run progresses and writes it back to the store

mod job_state;
mod tracker;

// Re-export main types
pub use job_state::{progress_percentage, CrawlJob, JobStatus};
pub use tracker::JobTracker;

//! Output module for reporting ingestion results
//!
//! This module handles:
//! - Reading store-wide statistics (articles, categories, recent jobs)
//! - Printing job records and run summaries for the command line

pub mod stats;

pub use stats::{
    load_statistics, print_job, print_job_summary, print_statistics, IngestStatistics,
};

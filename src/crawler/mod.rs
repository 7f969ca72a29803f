//! Crawler module for the ingestion pipeline
//!
//! This module contains the core crawling logic, including:
//! - HTTP transport and page fetching with failure classification
//! - Listing page discovery
//! - Article normalization (text, markdown, code, keywords, topics)
//! - Change detection against the stored fingerprint
//! - Windowed batch scheduling and overall job orchestration

mod discovery;
mod fetcher;
mod normalizer;
mod pipeline;
mod reconcile;
mod scheduler;
mod transport;

pub use discovery::discover;
pub use fetcher::{FetchOutcome, FetchedPage, PageFetcher};
pub use normalizer::{
    count_words, extract_keywords, normalize, CodeSnippet, ExtractionFailure, NormalizedArticle,
};
pub use pipeline::{
    select_targets, CrawlTarget, JobSummary, Pipeline, RunContext, TargetSelection,
};
pub use reconcile::{fingerprint, reconcile, Reconciled};
pub use scheduler::{BatchScheduler, FailureKind, ItemFailure, ItemResult, ItemSuccess, TargetSummary};
pub use transport::{HttpTransport, RequestOptions, Transport, TransportError, TransportResponse};

//! Batch scheduler
//!
//! Drives a target's URLs through fetch, normalize and reconcile in fixed-width
//! windows:
//! - every URL of a window runs concurrently in its own task
//! - a window is fully drained before the next one starts, so at most
//!   `concurrency` requests are ever in flight
//! - job counters are updated and persisted as each item finishes
//! - consecutive windows are separated by a fixed delay
//!
//! A failed item is counted and the run moves on; only the scheduler's caller can
//! abort a run. A panicking item task is reported against the URL it was spawned
//! for.

use crate::config::SiteConfig;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::normalizer::normalize;
use crate::crawler::reconcile::{reconcile, Reconciled};
use crate::crawler::{CrawlTarget, RunContext};
use crate::state::JobTracker;
use crate::storage::{lock, SharedStorage};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{Id, JoinSet};

/// Why an item did not produce an article
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport error or non-2xx status
    Fetch,
    /// The page could not be normalized
    Extraction,
    /// The item task itself panicked
    Task,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Fetch => "fetch",
            Self::Extraction => "extraction",
            Self::Task => "task",
        };
        write!(f, "{}", label)
    }
}

/// An item that produced an article, whether or not it was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSuccess {
    pub url: String,
    pub reconciled: Reconciled,
}

/// An item that failed before reaching the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub url: String,
    pub kind: FailureKind,
    pub message: String,
}

pub type ItemResult = Result<ItemSuccess, ItemFailure>;

/// Item counts for one target, or for a whole job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetSummary {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Articles inserted or updated
    pub written: u64,
}

impl TargetSummary {
    fn record(&mut self, result: &ItemResult) {
        match result {
            Ok(success) => {
                self.succeeded += 1;
                if success.reconciled.written() {
                    self.written += 1;
                }
            }
            Err(_) => self.failed += 1,
        }
    }

    /// Adds another summary's counts to this one
    pub fn absorb(&mut self, other: &TargetSummary) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.written += other.written;
    }
}

/// Runs windows of fetch/normalize/reconcile tasks
pub struct BatchScheduler {
    fetcher: PageFetcher,
    site: Arc<SiteConfig>,
    storage: SharedStorage,
    concurrency: usize,
    batch_delay: Duration,
}

impl BatchScheduler {
    pub fn new(
        fetcher: PageFetcher,
        site: Arc<SiteConfig>,
        storage: SharedStorage,
        concurrency: usize,
        batch_delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            site,
            storage,
            concurrency: concurrency.max(1),
            batch_delay,
        }
    }

    /// Processes every URL of `target`, updating `tracker` after each item
    pub async fn run_target(
        &self,
        ctx: &RunContext,
        target: &CrawlTarget,
        urls: &[String],
        tracker: &mut JobTracker,
    ) -> TargetSummary {
        let mut summary = TargetSummary {
            total: urls.len() as u64,
            ..TargetSummary::default()
        };
        let window_count = urls.len().div_ceil(self.concurrency);

        for (index, window) in urls.chunks(self.concurrency).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }

            tracing::debug!(
                "Target {}: window {}/{} ({} URLs)",
                target.slug,
                index + 1,
                window_count,
                window.len()
            );

            let mut tasks = JoinSet::new();
            let mut pending = HashMap::with_capacity(window.len());
            for url in window {
                let handle = tasks.spawn(process_item(
                    self.fetcher.clone(),
                    self.site.clone(),
                    self.storage.clone(),
                    ctx.source_id,
                    target.slug.clone(),
                    url.clone(),
                ));
                pending.insert(handle.id(), url.clone());
            }

            while let Some(result) = join_item(&mut tasks, &mut pending).await {
                match &result {
                    Ok(success) => {
                        tracing::debug!("Processed {}: {:?}", success.url, success.reconciled)
                    }
                    Err(failure) => tracing::warn!(
                        "Item {} failed ({}): {}",
                        failure.url,
                        failure.kind,
                        failure.message
                    ),
                }

                summary.record(&result);
                let written = matches!(&result, Ok(success) if success.reconciled.written());
                tracker.record_item(result.is_err(), written);
            }
        }

        tracing::info!(
            "Target {} done: {} succeeded, {} failed, {} written of {}",
            target.slug,
            summary.succeeded,
            summary.failed,
            summary.written,
            summary.total
        );
        summary
    }
}

/// Waits for the next item task of a window
///
/// `pending` maps each spawned task to its URL so that a task that panicked or
/// was cancelled is still reported against the right item.
async fn join_item(
    tasks: &mut JoinSet<ItemResult>,
    pending: &mut HashMap<Id, String>,
) -> Option<ItemResult> {
    let joined = tasks.join_next_with_id().await?;
    Some(match joined {
        Ok((id, result)) => {
            pending.remove(&id);
            result
        }
        Err(e) => Err(ItemFailure {
            url: pending.remove(&e.id()).unwrap_or_default(),
            kind: FailureKind::Task,
            message: e.to_string(),
        }),
    })
}

/// Fetches, normalizes and reconciles one URL
async fn process_item(
    fetcher: PageFetcher,
    site: Arc<SiteConfig>,
    storage: SharedStorage,
    source_id: i64,
    category: String,
    url: String,
) -> ItemResult {
    let page = fetcher.fetch(&url).await;
    if !page.is_success() {
        return Err(ItemFailure {
            kind: FailureKind::Fetch,
            message: page.error_message().unwrap_or_default(),
            url,
        });
    }

    let article = normalize(&page, &site).map_err(|failure| ItemFailure {
        url: url.clone(),
        kind: FailureKind::Extraction,
        message: failure.message,
    })?;

    // store failures are best-effort and do not fail the item
    let reconciled = match lock(&storage) {
        Ok(mut guard) => reconcile(&mut *guard, source_id, article, &category),
        Err(e) => {
            tracing::error!("Skipping write of {}: {}", url, e);
            Reconciled::WriteFailed(e.to_string())
        }
    };

    Ok(ItemSuccess { url, reconciled })
}

//! Ingestion pipeline - job orchestration
//!
//! Ties the pieces together for one crawl job:
//! - resolving the selected targets and the content source
//! - discovering every target's URLs up front, so the job total is known
//! - running each target through the batch scheduler
//! - moving the job to its terminal state

use crate::config::{Config, SiteConfig, TargetEntry, TargetKind};
use crate::crawler::discovery::discover;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::scheduler::{BatchScheduler, TargetSummary};
use crate::crawler::transport::{HttpTransport, Transport};
use crate::state::{CrawlJob, JobTracker};
use crate::storage::{lock, shared, SharedStorage, SqliteStorage};
use crate::IngestError;
use std::path::Path;
use std::sync::Arc;

/// A root listing page and the category its articles are stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub slug: String,
    pub title: String,
    pub url: String,
    pub kind: TargetKind,
}

impl From<&TargetEntry> for CrawlTarget {
    fn from(entry: &TargetEntry) -> Self {
        Self {
            slug: entry.slug.clone(),
            title: entry.title.clone(),
            url: entry.url.clone(),
            kind: entry.kind,
        }
    }
}

/// Which configured targets a job crawls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelection {
    All,
    Slugs(Vec<String>),
}

impl TargetSelection {
    /// Selects the given slugs, or every target when none are given
    pub fn from_slugs(slugs: Vec<String>) -> Self {
        if slugs.is_empty() {
            Self::All
        } else {
            Self::Slugs(slugs)
        }
    }
}

/// Resolves a selection against the configured targets
///
/// Slugs keep the order they were given in; any unknown slug rejects the whole
/// selection.
pub fn select_targets(
    targets: &[TargetEntry],
    selection: &TargetSelection,
) -> crate::Result<Vec<CrawlTarget>> {
    match selection {
        TargetSelection::All => Ok(targets.iter().map(CrawlTarget::from).collect()),
        TargetSelection::Slugs(slugs) => slugs
            .iter()
            .map(|slug| {
                targets
                    .iter()
                    .find(|entry| &entry.slug == slug)
                    .map(CrawlTarget::from)
                    .ok_or_else(|| IngestError::UnknownTarget(slug.clone()))
            })
            .collect(),
    }
}

/// Identifiers shared by every item of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    pub job_id: i64,
    pub source_id: i64,
}

/// Per-target and aggregate counts of a finished job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub job_id: i64,
    pub targets: Vec<(String, TargetSummary)>,
    pub total: TargetSummary,
}

pub struct Pipeline {
    config: Arc<Config>,
    site: Arc<SiteConfig>,
    fetcher: PageFetcher,
    storage: SharedStorage,
}

impl Pipeline {
    pub fn new(config: Config, transport: Arc<dyn Transport>, storage: SharedStorage) -> Self {
        let fetcher = PageFetcher::new(
            transport,
            &config.user_agent,
            config.crawler.request_timeout(),
        );

        Self {
            site: Arc::new(config.site.clone()),
            config: Arc::new(config),
            fetcher,
            storage,
        }
    }

    /// Builds a pipeline over HTTP and the configured SQLite database
    pub fn from_config(config: Config) -> crate::Result<Self> {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        let transport = HttpTransport::new()?;
        Ok(Self::new(config, Arc::new(transport), shared(storage)))
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// All configured targets, in configuration order
    pub fn list_targets(&self) -> Vec<CrawlTarget> {
        self.config.targets.iter().map(CrawlTarget::from).collect()
    }

    /// Resolves a selection against this pipeline's targets
    pub fn select_targets(&self, selection: &TargetSelection) -> crate::Result<Vec<CrawlTarget>> {
        select_targets(&self.config.targets, selection)
    }

    /// Persists a new pending job
    pub fn create_job(&self) -> crate::Result<CrawlJob> {
        let tracker = JobTracker::create(self.storage.clone(), self.config.crawler.max_retries)?;
        Ok(tracker.job().clone())
    }

    pub fn job_status(&self, job_id: i64) -> crate::Result<CrawlJob> {
        lock(&self.storage)?
            .get_job(job_id)?
            .ok_or(IngestError::JobNotFound(job_id))
    }

    /// Creates a job and runs it
    pub async fn run(&self, selection: &TargetSelection) -> crate::Result<JobSummary> {
        let job = self.create_job()?;
        self.run_job(job.id, selection).await
    }

    /// Runs a pending job to completion
    ///
    /// Item failures are counted on the job and never abort it. A run-level error
    /// marks the job failed with the error message and is returned.
    pub async fn run_job(&self, job_id: i64, selection: &TargetSelection) -> crate::Result<JobSummary> {
        let mut tracker = JobTracker::load(self.storage.clone(), job_id)?;

        match self.execute(&mut tracker, selection).await {
            Ok(summary) => {
                tracker.complete()?;
                tracing::info!(
                    "Job {} completed: {} URLs, {} failed, {} written",
                    job_id,
                    summary.total.total,
                    summary.total.failed,
                    summary.total.written
                );
                Ok(summary)
            }
            Err(e) => {
                tracing::error!("Job {} failed: {}", job_id, e);
                if let Err(mark_err) = tracker.fail(&e.to_string()) {
                    tracing::warn!("Could not mark job {} failed: {}", job_id, mark_err);
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        tracker: &mut JobTracker,
        selection: &TargetSelection,
    ) -> crate::Result<JobSummary> {
        let targets = self.select_targets(selection)?;
        let ctx = RunContext {
            job_id: tracker.job().id,
            source_id: self.resolve_source()?,
        };

        let mut plan = Vec::with_capacity(targets.len());
        for target in targets {
            let urls = discover(
                &self.fetcher,
                &self.site,
                &target.url,
                self.config.crawler.max_urls,
            )
            .await;
            plan.push((target, urls));
        }

        let total_urls = plan.iter().map(|(_, urls)| urls.len() as u64).sum();
        tracker.start(total_urls)?;

        let scheduler = BatchScheduler::new(
            self.fetcher.clone(),
            self.site.clone(),
            self.storage.clone(),
            self.config.crawler.concurrency as usize,
            self.config.crawler.batch_delay(),
        );

        let mut summary = JobSummary {
            job_id: ctx.job_id,
            targets: Vec::with_capacity(plan.len()),
            total: TargetSummary::default(),
        };

        for (target, urls) in &plan {
            tracing::info!(
                "Processing target {} ({}, {} URLs)",
                target.slug,
                target.kind.as_str(),
                urls.len()
            );
            let target_summary = scheduler.run_target(&ctx, target, urls, tracker).await;
            summary.total.absorb(&target_summary);
            summary.targets.push((target.slug.clone(), target_summary));
        }

        Ok(summary)
    }

    /// Finds the configured site's source record, registering it on first use
    fn resolve_source(&self) -> crate::Result<i64> {
        let mut storage = lock(&self.storage)?;
        if let Some(source) = storage.find_source(&self.site.name)? {
            if source.base_url != self.site.base_url {
                tracing::warn!(
                    "Source {} is registered with base URL {}, configuration says {}",
                    source.name,
                    source.base_url,
                    self.site.base_url
                );
            }
            return Ok(source.id);
        }

        let id = storage.insert_source(&self.site.name, &self.site.base_url)?;
        tracing::info!("Registered source {} ({})", self.site.name, id);
        Ok(id)
    }
}

//! learn-ingest main entry point
//!
//! This is the command-line interface for the tutorial content ingestion pipeline.

use anyhow::Context;
use clap::Parser;
use learn_ingest::config::{load_config_with_hash, Config};
use learn_ingest::crawler::select_targets;
use learn_ingest::output::{load_statistics, print_job, print_job_summary, print_statistics};
use learn_ingest::storage::lock;
use learn_ingest::{Pipeline, TargetSelection};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// learn-ingest: tutorial content ingestion
///
/// learn-ingest discovers the tutorial pages behind configured certification and
/// topic listings, normalizes them into articles, and stores only what changed.
/// Every run is recorded as a crawl job with progress counters.
#[derive(Parser, Debug)]
#[command(name = "learn-ingest")]
#[command(version = "1.0.0")]
#[command(about = "Tutorial content ingestion pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Crawl only the target with this slug (repeatable)
    #[arg(long = "target", value_name = "SLUG")]
    targets: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// List the configured targets and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "job_status"])]
    list_targets: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "job_status"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "job_status"])]
    stats: bool,

    /// Show one crawl job and exit
    #[arg(long, value_name = "ID")]
    job_status: Option<i64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let selection = TargetSelection::from_slugs(cli.targets);

    if cli.list_targets {
        handle_list_targets(&config);
    } else if cli.dry_run {
        handle_dry_run(&config, &selection)?;
    } else if cli.stats {
        handle_stats(config)?;
    } else if let Some(job_id) = cli.job_status {
        handle_job_status(config, job_id)?;
    } else {
        handle_run(config, &selection).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("learn_ingest=info,warn"),
            1 => EnvFilter::new("learn_ingest=debug,info"),
            2 => EnvFilter::new("learn_ingest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --list-targets: prints every configured target
fn handle_list_targets(config: &Config) {
    println!("Targets ({}):", config.targets.len());
    for target in &config.targets {
        println!(
            "  {:<24} {:<13} {}",
            target.slug,
            target.kind.as_str(),
            target.title
        );
        println!("  {:<24} {:<13} {}", "", "", target.url);
    }
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, selection: &TargetSelection) -> anyhow::Result<()> {
    println!("=== learn-ingest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Batch delay: {}ms", config.crawler.batch_delay_ms);
    println!("  Max URLs per target: {}", config.crawler.max_urls);
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nSite:");
    println!("  Name: {}", config.site.name);
    println!("  Base URL: {}", config.site.base_url);
    println!("  Content prefixes: {}", config.site.content_prefixes.join(", "));
    println!("  Content selectors: {}", config.site.content_selectors.join(", "));

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let selected = select_targets(&config.targets, selection)?;

    println!("\nSelected Targets ({}):", selected.len());
    for target in &selected {
        println!("  - {} ({}): {}", target.slug, target.kind.as_str(), target.url);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl up to {} URLs",
        selected.len() * config.crawler.max_urls
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let pipeline = Pipeline::from_config(config).context("Failed to open the content store")?;
    let stats = load_statistics(&*lock(pipeline.storage())?)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles --job-status: prints one job record
fn handle_job_status(config: Config, job_id: i64) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config).context("Failed to open the content store")?;
    let job = pipeline.job_status(job_id)?;
    print_job(&job);
    Ok(())
}

/// Handles the main ingestion run
async fn handle_run(config: Config, selection: &TargetSelection) -> anyhow::Result<()> {
    match selection {
        TargetSelection::All => {
            tracing::info!("Crawling all {} targets", config.targets.len())
        }
        TargetSelection::Slugs(slugs) => {
            tracing::info!("Crawling selected targets: {}", slugs.join(", "))
        }
    }

    let pipeline = Pipeline::from_config(config).context("Failed to initialize pipeline")?;
    let job = pipeline.create_job().context("Failed to create crawl job")?;

    match pipeline.run_job(job.id, selection).await {
        Ok(summary) => {
            print_job_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl job {} failed: {}", job.id, e);
            Err(anyhow::Error::new(e).context(format!("Crawl job {} failed", job.id)))
        }
    }
}

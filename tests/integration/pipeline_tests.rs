//! Integration tests for the ingestion pipeline
//!
//! These tests use wiremock to create mock HTTP servers and run whole crawl jobs
//! end-to-end against an on-disk SQLite database.

use learn_ingest::config::{
    parse_config, Config, CrawlerConfig, OutputConfig, SiteConfig, TargetEntry, TargetKind,
    UserAgentConfig,
};
use learn_ingest::storage::{lock, Storage};
use learn_ingest::{IngestError, JobStatus, Pipeline, TargetSelection};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_AGENT: &str = "TestBot/1.0.0 (+https://example.com/contact; test@example.com)";

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            concurrency: 2,
            batch_delay_ms: 10, // Very short for testing
            max_urls: 50,
            request_timeout_ms: 500,
            max_retries: 3,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
        site: SiteConfig {
            name: "Mock Learn".to_string(),
            base_url: base_url.to_string(),
            content_prefixes: vec!["/learn/modules/".to_string()],
            skip_segments: vec!["learn".to_string()],
            content_selectors: vec!["div.content".to_string(), "main".to_string()],
            default_language: "text".to_string(),
        },
        targets: vec![TargetEntry {
            slug: "az-900".to_string(),
            title: "Azure Fundamentals".to_string(),
            url: format!("{}/learn/paths/az-900", base_url),
            kind: TargetKind::Certification,
        }],
    }
}

fn module_page(title: &str) -> String {
    format!(
        r#"<html><head><title>{title} | Learn</title></head><body>
        <nav>Navigation that is not content</nav>
        <div class="content">
            <h1>{title}</h1>
            <p>This module covers {title} with storage accounts and containers.</p>
            <pre><code class="language-bash">az storage account create --name demo</code></pre>
        </div></body></html>"#,
        title = title
    )
}

/// Mounts the listing page and three module pages
///
/// A module named in `replaced` answers with the given response instead.
async fn mount_site(server: &MockServer, replaced: Option<(&str, ResponseTemplate)>) {
    Mock::given(method("GET"))
        .and(path("/learn/paths/az-900"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><title>AZ-900</title></head><body><main>
                <h1>Azure Fundamentals</h1>
                <p>Learning path overview.</p>
                <a href="/learn/modules/cloud-concepts/">Cloud concepts</a>
                <a href="/learn/modules/storage/">Storage</a>
                <a href="/about">About</a>
                <a href="/learn/modules/networking/#units">Networking</a>
                <a href="/learn/modules/storage/">Storage again</a>
            </main></body></html>"#,
        ))
        .mount(server)
        .await;

    for (slug, title) in [
        ("cloud-concepts", "Cloud Concepts"),
        ("storage", "Storage"),
        ("networking", "Networking"),
    ] {
        let module_path = format!("/learn/modules/{}/", slug);
        let response = match &replaced {
            Some((name, response)) if *name == slug => response.clone(),
            _ => ResponseTemplate::new(200)
                .set_body_string(module_page(title))
                .insert_header("content-type", "text/html"),
        };

        Mock::given(method("GET"))
            .and(path(module_path.as_str()))
            .respond_with(response)
            .mount(server)
            .await;
    }
}

fn db_path(dir: &TempDir) -> String {
    dir.path().join("ingest.db").to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_full_run_writes_every_article() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, None).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &db_path(&dir));
    let pipeline = Pipeline::from_config(config).expect("Failed to create pipeline");

    let summary = pipeline.run(&TargetSelection::All).await.unwrap();

    // listing root + three distinct module links
    assert_eq!(summary.total.total, 4);
    assert_eq!(summary.total.failed, 0);
    assert_eq!(summary.total.written, 4);

    let job = pipeline.job_status(summary.job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.urls_processed, 4);
    assert_eq!(job.items_written, 4);
    assert_eq!(job.progress, 100.0);

    let storage = lock(pipeline.storage()).unwrap();
    assert_eq!(storage.count_articles().unwrap(), 4);
    assert_eq!(storage.count_unprocessed_articles().unwrap(), 4);
    assert_eq!(
        storage.count_articles_by_category().unwrap(),
        vec![("az-900".to_string(), 4)]
    );

    let storage_url = format!("{}/learn/modules/storage/", mock_server.uri());
    let stored = storage.find_article(&storage_url).unwrap().unwrap();
    assert_eq!(stored.url, storage_url);
    assert!(!stored.processed);
    assert_eq!(stored.content_hash.len(), 64);
}

#[tokio::test]
async fn test_rerun_skips_unchanged_articles() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, None).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &db_path(&dir));
    let pipeline = Pipeline::from_config(config).unwrap();

    let first = pipeline.run(&TargetSelection::All).await.unwrap();
    let second = pipeline.run(&TargetSelection::All).await.unwrap();

    assert_eq!(first.total.written, 4);
    assert_eq!(second.total.written, 0);
    assert_eq!(second.total.succeeded, 4);

    let job = pipeline.job_status(second.job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.items_written, 0);
}

#[tokio::test]
async fn test_server_error_mid_batch_completes_job() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, Some(("storage", ResponseTemplate::new(500)))).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &db_path(&dir));
    let pipeline = Pipeline::from_config(config).unwrap();

    let summary = pipeline.run(&TargetSelection::All).await.unwrap();
    assert_eq!(summary.total.failed, 1);
    assert_eq!(summary.total.succeeded, 3);

    let job = pipeline.job_status(summary.job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.urls_failed >= 1);
    assert_eq!(job.urls_processed, job.total_urls);
    assert_eq!(job.progress, 100.0);
}

#[tokio::test]
async fn test_request_timeout_is_an_item_failure() {
    let mock_server = MockServer::start().await;
    let slow = ResponseTemplate::new(200)
        .set_body_string(module_page("Networking"))
        .set_delay(Duration::from_secs(3));
    mount_site(&mock_server, Some(("networking", slow))).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &db_path(&dir));
    let pipeline = Pipeline::from_config(config).unwrap();

    let summary = pipeline.run(&TargetSelection::All).await.unwrap();
    assert_eq!(summary.total.failed, 1);

    let job = pipeline.job_status(summary.job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.urls_failed, 1);
}

#[tokio::test]
async fn test_unreachable_listing_crawls_root_only() {
    let mock_server = MockServer::start().await;
    // nothing mounted: every request answers 404

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &db_path(&dir));
    let pipeline = Pipeline::from_config(config).unwrap();

    let summary = pipeline.run(&TargetSelection::All).await.unwrap();
    assert_eq!(summary.total.total, 1);
    assert_eq!(summary.total.failed, 1);

    let job = pipeline.job_status(summary.job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.total_urls, 1);
}

#[tokio::test]
async fn test_unknown_target_fails_job() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, None).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &db_path(&dir));
    let pipeline = Pipeline::from_config(config).unwrap();

    let job = pipeline.create_job().unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    let selection = TargetSelection::from_slugs(vec!["ai-900".to_string()]);
    let result = pipeline.run_job(job.id, &selection).await;
    assert!(matches!(result, Err(IngestError::UnknownTarget(_))));

    let job = pipeline.job_status(job.id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.last_error.is_some());
    assert_eq!(job.urls_processed, 0);
    assert_eq!(lock(pipeline.storage()).unwrap().count_articles().unwrap(), 0);
}

#[tokio::test]
async fn test_run_from_toml_config() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, None).await;

    let dir = TempDir::new().unwrap();
    let toml = format!(
        r#"
[crawler]
concurrency = 3
batch-delay-ms = 10
request-timeout-ms = 5000

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
database-path = "{db}"

[site]
name = "Mock Learn"
base-url = "{base}"
content-prefixes = ["/learn/modules/"]

[[target]]
slug = "az-900"
title = "Azure Fundamentals"
url = "{base}/learn/paths/az-900"
kind = "certification"
"#,
        db = db_path(&dir),
        base = mock_server.uri()
    );

    let config = parse_config(&toml).expect("Config should parse and validate");
    assert_eq!(config.crawler.max_urls, 50);
    assert_eq!(config.site.default_language, "text");

    let pipeline = Pipeline::from_config(config).unwrap();
    let summary = pipeline
        .run(&TargetSelection::from_slugs(vec!["az-900".to_string()]))
        .await
        .unwrap();
    assert_eq!(summary.targets.len(), 1);
    assert_eq!(summary.total.written, 4);
}

//! Page fetcher
//!
//! Retrieves one URL through the configured [`Transport`] with a bounded timeout
//! and the crawler's identifying user agent. Every failure, whether a transport
//! error or a non-2xx status, is folded into the returned [`FetchedPage`]; nothing
//! is raised and nothing is retried here.

use crate::config::UserAgentConfig;
use crate::crawler::transport::{RequestOptions, Transport};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one fetch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 2xx response with its body
    Success {
        /// HTTP status code
        status_code: u16,
        /// Raw markup
        body: String,
    },

    /// The server answered with a non-2xx status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// No response was received (timeout, DNS, connection refused...)
    NetworkError {
        /// Error description
        error: String,
    },
}

/// Raw result of retrieving one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub outcome: FetchOutcome,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Success { .. })
    }

    /// Markup of a successful fetch
    pub fn body(&self) -> Option<&str> {
        match &self.outcome {
            FetchOutcome::Success { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Human-readable failure description, None on success
    pub fn error_message(&self) -> Option<String> {
        match &self.outcome {
            FetchOutcome::Success { .. } => None,
            FetchOutcome::HttpError { status_code } => Some(format!("HTTP {}", status_code)),
            FetchOutcome::NetworkError { error } => Some(error.clone()),
        }
    }
}

/// Fetches pages with a fixed timeout and user agent
#[derive(Clone)]
pub struct PageFetcher {
    transport: Arc<dyn Transport>,
    options: RequestOptions,
}

impl PageFetcher {
    /// Creates a fetcher that identifies itself as
    /// `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn new(transport: Arc<dyn Transport>, user_agent: &UserAgentConfig, timeout: Duration) -> Self {
        Self {
            transport,
            options: RequestOptions {
                timeout,
                headers: vec![("User-Agent".to_string(), user_agent.header_value())],
            },
        }
    }

    /// Fetches a URL, classifying every failure into the returned page
    pub async fn fetch(&self, url: &str) -> FetchedPage {
        let outcome = match self.transport.get(url, &self.options).await {
            Ok(response) if (200..300).contains(&response.status) => FetchOutcome::Success {
                status_code: response.status,
                body: response.body,
            },
            Ok(response) => {
                tracing::debug!("HTTP {} for {}", response.status, url);
                FetchOutcome::HttpError {
                    status_code: response.status,
                }
            }
            Err(e) => {
                tracing::debug!("Fetch of {} failed: {}", url, e);
                FetchOutcome::NetworkError {
                    error: e.to_string(),
                }
            }
        };

        FetchedPage {
            url: url.to_string(),
            outcome,
        }
    }
}

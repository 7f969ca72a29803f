use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, SiteConfig, TargetEntry, UserAgentConfig,
};
use crate::{ConfigError, ConfigResult};
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_site_config(&config.site)?;
    validate_targets(&config.targets)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.concurrency < 1 || config.concurrency > 20 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 20, got {}",
            config.concurrency
        )));
    }

    if config.max_urls < 1 || config.max_urls > 500 {
        return Err(ConfigError::Validation(format!(
            "max_urls must be between 1 and 500, got {}",
            config.max_urls
        )));
    }

    if config.request_timeout_ms < 1000 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 1000ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> ConfigResult<()> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the site layout description
fn validate_site_config(config: &SiteConfig) -> ConfigResult<()> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "site name cannot be empty".to_string(),
        ));
    }

    validate_http_url("base-url", &config.base_url)?;

    if config.content_prefixes.is_empty() {
        return Err(ConfigError::Validation(
            "site must declare at least one content prefix".to_string(),
        ));
    }

    for prefix in &config.content_prefixes {
        if !prefix.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "content prefix '{}' must start with '/'",
                prefix
            )));
        }
    }

    if config.content_selectors.is_empty() {
        return Err(ConfigError::Validation(
            "site must declare at least one content selector".to_string(),
        ));
    }

    for selector in &config.content_selectors {
        scraper::Selector::parse(selector).map_err(|e| {
            ConfigError::Validation(format!("Invalid content selector '{}': {}", selector, e))
        })?;
    }

    if config.default_language.trim().is_empty() {
        return Err(ConfigError::Validation(
            "default_language cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl targets: unique slugs and fetchable root URLs
fn validate_targets(targets: &[TargetEntry]) -> ConfigResult<()> {
    let mut seen = HashSet::new();

    for target in targets {
        if target.slug.is_empty()
            || !target
                .slug
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::Validation(format!(
                "target slug '{}' must be non-empty and contain only [A-Za-z0-9_-]",
                target.slug
            )));
        }

        if !seen.insert(target.slug.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate target slug '{}'",
                target.slug
            )));
        }

        validate_http_url(&format!("target '{}'", target.slug), &target.url)?;
    }

    Ok(())
}

/// Requires an absolute http(s) URL
fn validate_http_url(label: &str, value: &str) -> ConfigResult<()> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", label, value, e)))?;

    // http stays allowed so mock servers can stand in for the site
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            label, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> ConfigResult<()> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    Ok(())
}

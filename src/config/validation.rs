use crate::config::types::{CatalogConfig, Config, CrawlerConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_catalog_config(&config.catalog)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_catalog_config(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&catalog.base_url)
        .map_err(|e| ConfigError::Validation(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base-url must be http or https, got '{}'",
            url.scheme()
        )));
    }

    if !catalog.root_path.starts_with('/') || !catalog.root_path.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "root-path must start and end with '/', got '{}'",
            catalog.root_path
        )));
    }

    if catalog.city.is_empty() {
        return Err(ConfigError::Validation("city must not be empty".to_string()));
    }

    Ok(())
}

fn validate_crawler_config(crawler: &CrawlerConfig) -> Result<(), ConfigError> {
    if crawler.concurrency == 0 {
        return Err(ConfigError::Validation(
            "concurrency must be at least 1".to_string(),
        ));
    }

    if crawler.page_cap == 0 {
        return Err(ConfigError::Validation(
            "page-cap must be at least 1".to_string(),
        ));
    }

    if crawler.count_cap == 0 {
        return Err(ConfigError::Validation(
            "count-cap must be at least 1".to_string(),
        ));
    }

    for proxy in &crawler.proxies {
        Url::parse(proxy)
            .map_err(|e| ConfigError::Validation(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    if crawler.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(output: &OutputConfig) -> Result<(), ConfigError> {
    if output.sink_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "sink-path must not be empty".to_string(),
        ));
    }
    Ok(())
}

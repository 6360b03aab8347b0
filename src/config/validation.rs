use crate::config::types::{Config, CrawlerConfig, FetchConfig, FetchMode, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// Called after loading a file and again after command-line overrides are
/// applied, since either can introduce an invalid value.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let target = Url::parse(&config.target_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid target URL '{}': {}", config.target_url, e))
    })?;

    if target.scheme() != "http" && target.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Target URL '{}' must use http or https",
            config.target_url
        )));
    }

    if target.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Target URL '{}' has no host",
            config.target_url
        )));
    }

    if config.max_concurrent_downloads < 1 || config.max_concurrent_downloads > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-downloads must be between 1 and 100, got {}",
            config.max_concurrent_downloads
        )));
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 || config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be between 1 and 10, got {}",
            config.max_retries
        )));
    }

    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs and connect-timeout-secs must be greater than zero".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.mode == FetchMode::Render {
        if config.render_command.is_empty() || config.render_command[0].trim().is_empty() {
            return Err(ConfigError::Validation(
                "render-command cannot be empty in render mode".to_string(),
            ));
        }

        if config.render_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "render-timeout-secs must be greater than zero".to_string(),
            ));
        }
    }

    if let Some(proxy) = &config.proxy {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;

        if !matches!(url.scheme(), "http" | "https" | "socks5" | "socks5h") {
            return Err(ConfigError::Validation(format!(
                "Proxy '{}' must use http, https or socks5",
                proxy
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

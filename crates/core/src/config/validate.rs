use super::{
    types::{AuthMethod, Config},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - API key present when api_key auth is selected
/// - Site base URL is http(s) and credentials are set
/// - Retry and pagination limits are at least 1
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().is_none_or(str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key is required when auth.method = \"api_key\"".to_string(),
        ));
    }

    let base_url = &config.site.base_url;
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "site.base_url must start with http:// or https://, got {}",
            base_url
        )));
    }

    if config.site.username.is_empty() || config.site.password.is_empty() {
        return Err(ConfigError::ValidationError(
            "site.username and site.password cannot be empty".to_string(),
        ));
    }

    if config.session.login_retries == 0 {
        return Err(ConfigError::ValidationError(
            "session.login_retries must be at least 1".to_string(),
        ));
    }

    if config.scraper.max_search_pages == 0 {
        return Err(ConfigError::ValidationError(
            "scraper.max_search_pages must be at least 1".to_string(),
        ));
    }

    if let Some(cache) = &config.cache {
        if cache.url.is_empty() {
            return Err(ConfigError::ValidationError(
                "cache.url cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

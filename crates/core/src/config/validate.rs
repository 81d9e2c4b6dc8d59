use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Orchestrator cap, TTL and sweep interval are positive
/// - Downloader format is set and the source URL template has an `{id}` slot
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let orchestrator = &config.orchestrator;
    if orchestrator.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.max_concurrent must be at least 1".to_string(),
        ));
    }
    if orchestrator.status_ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.status_ttl_secs must be at least 1".to_string(),
        ));
    }
    if orchestrator.sweep_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.sweep_interval_ms must be at least 1".to_string(),
        ));
    }

    let downloader = &config.downloader;
    if downloader.format.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "downloader.format cannot be empty".to_string(),
        ));
    }
    if !downloader.source_url_template.contains("{id}") {
        return Err(ConfigError::ValidationError(
            "downloader.source_url_template must contain {id}".to_string(),
        ));
    }

    Ok(())
}

use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Prowlarr URL is http(s) and the resolver pool has at least one slot
/// - Version names are non-empty and unique
/// - Rule values fit their operators
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if let Some(prowlarr) = &config.searcher.prowlarr {
        if !(prowlarr.url.starts_with("http://") || prowlarr.url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "searcher.prowlarr.url must be an http(s) URL, got '{}'",
                prowlarr.url
            )));
        }
        if prowlarr.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "searcher.prowlarr.concurrency must be at least 1".to_string(),
            ));
        }
    }

    let mut names = HashSet::new();
    for version in &config.versions {
        if version.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "version name cannot be empty".to_string(),
            ));
        }
        if !names.insert(version.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate version name '{}'",
                version.name
            )));
        }
        for rule in &version.rules {
            rule.validate().map_err(|e| {
                ConfigError::ValidationError(format!("version '{}': {}", version.name, e))
            })?;
        }
    }

    Ok(())
}

//! Configuration validation
//!
//! Validates config consistency:
//! - At least one enabled source, each with exactly one endpoint
//! - Source ids are unique
//! - At least one enabled sink
//! - Elasticsearch has credentials and an index when enabled
//! - Progress interval is non-zero

use std::collections::HashSet;

use crate::Config;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_global(config)?;
    validate_sources(config)?;
    validate_sinks(config)?;
    Ok(())
}

fn validate_global(config: &Config) -> Result<()> {
    if config.global.progress_interval == 0 {
        return Err(ConfigError::invalid_value(
            "global",
            "global",
            "progress_interval",
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_sources(config: &Config) -> Result<()> {
    let mut seen = HashSet::new();
    let mut enabled = 0usize;

    for source in config.sources.iter().filter(|s| s.enabled) {
        enabled += 1;

        if source.id.trim().is_empty() {
            return Err(ConfigError::missing_field("source", "<unnamed>", "id"));
        }

        if !seen.insert(source.id.as_str()) {
            return Err(ConfigError::duplicate_source(&source.id));
        }

        match (&source.path, &source.address) {
            (Some(path), None) if !path.trim().is_empty() => {}
            (None, Some(address)) if !address.trim().is_empty() => {}
            (Some(_), Some(_)) => {
                return Err(ConfigError::invalid_value(
                    "source",
                    &source.id,
                    "path",
                    "set either path or address, not both",
                ));
            }
            _ => return Err(ConfigError::missing_field("source", &source.id, "path")),
        }
    }

    if enabled == 0 {
        return Err(ConfigError::NoSourcesEnabled);
    }

    Ok(())
}

fn validate_sinks(config: &Config) -> Result<()> {
    if config.sinks.enabled().is_empty() {
        return Err(ConfigError::NoSinksEnabled);
    }

    let file = &config.sinks.file;
    if file.enabled && file.path.trim().is_empty() {
        return Err(ConfigError::missing_field("sink", "file", "path"));
    }

    let es = &config.sinks.elasticsearch;
    if es.enabled {
        if es.password.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::missing_field("sink", "elasticsearch", "password"));
        }
        if es.index.trim().is_empty() {
            return Err(ConfigError::missing_field("sink", "elasticsearch", "index"));
        }
        if !es.url.starts_with("http://") && !es.url.starts_with("https://") {
            return Err(ConfigError::invalid_value(
                "sink",
                "elasticsearch",
                "url",
                "must start with http:// or https://",
            ));
        }
    }

    Ok(())
}

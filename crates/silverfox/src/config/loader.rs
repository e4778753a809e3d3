use std::collections::HashSet;
use std::path::Path;

use crate::config::schema::{parse_time_of_day, Config};
use crate::error::ConfigError;
use crate::sanitize;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    for value in [&config.schedule.import_at, &config.schedule.cao_at] {
        if parse_time_of_day(value).is_none() {
            return Err(ConfigError::InvalidTime {
                value: value.clone(),
            });
        }
    }

    if config.schedule.poll_interval_secs == 0 {
        return Err(ConfigError::Validation {
            message: "schedule.poll_interval_secs must be positive".to_string(),
        });
    }

    if config.qr.size < 21 {
        return Err(ConfigError::Validation {
            message: format!("qr.size {} is smaller than a version 1 QR code", config.qr.size),
        });
    }

    let mut names = HashSet::new();
    let mut slugs = HashSet::new();
    for dealership in &config.dealerships {
        if !names.insert(dealership.name.as_str()) {
            return Err(ConfigError::InvalidDealership {
                name: dealership.name.clone(),
                reason: "Duplicate dealership name".to_string(),
            });
        }

        let slug = dealership.slug();
        if sanitize::vin_log_table(&slug).is_none() {
            return Err(ConfigError::InvalidDealership {
                name: dealership.name.clone(),
                reason: format!("Name does not produce a usable table slug ('{}')", slug),
            });
        }
        if !slugs.insert(slug.clone()) {
            return Err(ConfigError::InvalidDealership {
                name: dealership.name.clone(),
                reason: format!("Slug '{}' collides with another dealership", slug),
            });
        }
    }

    Ok(())
}

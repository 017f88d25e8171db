use std::path::Path;

use crate::config::schema::{Config, SettingsConfig};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

const LIMIT_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

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
        return Err(validation(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    let storage = &config.storage;
    if storage.input_container.trim().is_empty() || storage.output_container.trim().is_empty() {
        return Err(validation("Container names must not be empty"));
    }

    // '-' separates the prefix from the source key, so a prefix containing it
    // would overlap the job names of another prefix ("run" vs "run-nightly").
    let prefix = &config.transcription.job_prefix;
    if prefix.is_empty()
        || !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_'))
    {
        return Err(validation(format!(
            "Job prefix '{}' may only contain letters, digits, '.' and '_'",
            prefix
        )));
    }

    validate_settings(&config.transcription.settings)?;

    let execution = &config.transcription.execution;
    let has_role = execution
        .data_access_role_arn
        .as_deref()
        .is_some_and(|arn| !arn.trim().is_empty());
    if execution.allow_deferred_execution && !has_role {
        return Err(validation(
            "Deferred execution requires data_access_role_arn",
        ));
    }

    if let Some(vocabulary) = &config.transcription.vocabulary {
        if vocabulary.phrases.is_empty() {
            return Err(validation(format!(
                "Vocabulary '{}' has no phrases",
                vocabulary.name
            )));
        }
    }

    let wait = &config.wait;
    if wait.poll_interval_secs == 0 || wait.max_attempts == 0 || wait.concurrency == 0 {
        return Err(validation(
            "Wait interval, attempts and concurrency must be positive",
        ));
    }

    Ok(())
}

fn validate_settings(settings: &SettingsConfig) -> Result<(), ConfigError> {
    let checks = [
        (
            "max_speaker_labels",
            settings.show_speaker_labels,
            settings.max_speaker_labels,
        ),
        (
            "max_alternatives",
            settings.show_alternatives,
            settings.max_alternatives,
        ),
    ];

    for (field, enabled, limit) in checks {
        match limit {
            Some(value) if !LIMIT_RANGE.contains(&value) => {
                return Err(validation(format!(
                    "{} must be between 1 and 10, got {}",
                    field, value
                )));
            }
            None if enabled => {
                return Err(validation(format!("{} is required when enabled", field)));
            }
            _ => {}
        }
    }

    Ok(())
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

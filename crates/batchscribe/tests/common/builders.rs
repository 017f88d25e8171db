//! Builder patterns for creating test configurations programmatically.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use batchscribe::config::VocabularyConfig;
use batchscribe::service::JobSettings;
use batchscribe::{PipelineConfig, WaitPolicy};

pub const INPUT_CONTAINER: &str = "media-in";
pub const OUTPUT_CONTAINER: &str = "media-out";

/// Builder for creating `PipelineConfig` instances.
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Sensible defaults for testing: prefix `run`, one-second polls, five attempts.
    pub fn new(input_directory: &Path, output_directory: &Path) -> Self {
        Self {
            config: PipelineConfig {
                input_directory: input_directory.to_path_buf(),
                output_directory: output_directory.to_path_buf(),
                input_container: INPUT_CONTAINER.to_string(),
                output_container: OUTPUT_CONTAINER.to_string(),
                region: "local".to_string(),
                job_prefix: "run".to_string(),
                language_code: "en-US".to_string(),
                media_format: None,
                vocabulary: None,
                settings: JobSettings::default(),
                archive_prefix: "archive".to_string(),
                wait_policy: WaitPolicy::new(Duration::from_secs(1), 5),
                wait_concurrency: 4,
            },
        }
    }

    pub fn job_prefix(mut self, prefix: &str) -> Self {
        self.config.job_prefix = prefix.to_string();
        self
    }

    pub fn vocabulary(mut self, name: &str, phrases: &[&str]) -> Self {
        self.config.vocabulary = Some(VocabularyConfig {
            name: name.to_string(),
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
        });
        self
    }

    pub fn wait_policy(mut self, poll_interval: Duration, max_attempts: u32) -> Self {
        self.config.wait_policy = WaitPolicy::new(poll_interval, max_attempts);
        self
    }

    pub fn wait_concurrency(mut self, concurrency: usize) -> Self {
        self.config.wait_concurrency = concurrency;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

/// Minimal valid configuration file body; `extra` fields are merged into
/// the `transcription` section.
pub fn config_json(extra_transcription: serde_json::Value) -> String {
    let mut value = serde_json::json!({
        "version": "1.0",
        "storage": {
            "input_container": INPUT_CONTAINER,
            "output_container": OUTPUT_CONTAINER,
            "region": "eu-central-1"
        },
        "transcription": {
            "job_prefix": "run",
            "language_code": "en-US"
        },
        "paths": {
            "input_directory": "/data/audio",
            "output_directory": "/data/reports"
        }
    });
    if let (Some(section), Some(extra)) = (
        value["transcription"].as_object_mut(),
        extra_transcription.as_object(),
    ) {
        for (key, field) in extra {
            section.insert(key.clone(), field.clone());
        }
    }
    serde_json::to_string_pretty(&value).expect("Failed to serialize config")
}

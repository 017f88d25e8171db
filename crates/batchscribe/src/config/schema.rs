use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::service::JobSettings;
use crate::waiter::{WaitPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub storage: StorageConfig,
    pub transcription: TranscriptionConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub wait: WaitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub input_container: String,
    pub output_container: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores.
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub job_prefix: String,
    pub language_code: String,
    /// Left to the service to detect when absent.
    #[serde(default)]
    pub media_format: Option<String>,
    #[serde(default)]
    pub vocabulary: Option<VocabularyConfig>,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyConfig {
    pub name: String,
    pub phrases: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default)]
    pub show_speaker_labels: bool,
    #[serde(default)]
    pub max_speaker_labels: Option<u8>,
    #[serde(default)]
    pub show_alternatives: bool,
    #[serde(default)]
    pub max_alternatives: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub allow_deferred_execution: bool,
    #[serde(default)]
    pub data_access_role_arn: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub input_directory: String,
    pub output_directory: String,
    #[serde(default = "default_archive_prefix")]
    pub archive_prefix: String,
}

fn default_archive_prefix() -> String {
    "archive".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_concurrency() -> usize {
    4
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_attempts: default_max_attempts(),
            concurrency: default_concurrency(),
        }
    }
}

impl WaitConfig {
    pub fn policy(&self) -> WaitPolicy {
        WaitPolicy::new(
            Duration::from_secs(self.poll_interval_secs),
            self.max_attempts,
        )
    }
}

impl TranscriptionConfig {
    /// Per-job settings; limits only apply when their feature is switched on.
    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            max_speaker_labels: self
                .settings
                .max_speaker_labels
                .filter(|_| self.settings.show_speaker_labels),
            max_alternatives: self
                .settings
                .max_alternatives
                .filter(|_| self.settings.show_alternatives),
            deferred_execution_role_arn: self
                .execution
                .data_access_role_arn
                .clone()
                .filter(|_| self.execution.allow_deferred_execution),
        }
    }
}

use std::path::PathBuf;

use crate::config::{Config, VocabularyConfig};
use crate::service::JobSettings;
use crate::waiter::WaitPolicy;

/// Everything one run needs, resolved from the validated [`Config`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_directory: PathBuf,
    pub output_directory: PathBuf,
    pub input_container: String,
    pub output_container: String,
    pub region: String,
    pub job_prefix: String,
    pub language_code: String,
    pub media_format: Option<String>,
    pub vocabulary: Option<VocabularyConfig>,
    pub settings: JobSettings,
    pub archive_prefix: String,
    pub wait_policy: WaitPolicy,
    pub wait_concurrency: usize,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        let transcription = &config.transcription;
        Self {
            input_directory: PathBuf::from(&config.paths.input_directory),
            output_directory: PathBuf::from(&config.paths.output_directory),
            input_container: config.storage.input_container.clone(),
            output_container: config.storage.output_container.clone(),
            region: config.storage.region.clone(),
            job_prefix: transcription.job_prefix.clone(),
            language_code: transcription.language_code.clone(),
            media_format: transcription.media_format.clone(),
            vocabulary: transcription.vocabulary.clone(),
            settings: transcription.job_settings(),
            archive_prefix: config.paths.archive_prefix.clone(),
            wait_policy: config.wait.policy(),
            wait_concurrency: config.wait.concurrency.max(1),
        }
    }
}

//! Remote transcription job service.
//!
//! The pipeline only talks to the service through [`TranscriptionService`];
//! the service owns job state and the pipeline observes it.

#[cfg(feature = "aws")]
pub mod aws;
pub mod simulated;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::job::{Job, VocabularyState};

#[cfg(feature = "aws")]
pub use aws::AwsTranscribeService;
pub use simulated::{Outcome, SimulatedTranscriptionService};

/// Optional per-job transcription settings. A `Some` limit implies the
/// matching feature is switched on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSettings {
    /// Speaker partitioning, 1–10 speakers.
    pub max_speaker_labels: Option<u8>,
    /// Alternative transcriptions, 1–10 alternatives.
    pub max_alternatives: Option<u8>,
    /// Deferred execution when the account is at its concurrency limit.
    pub deferred_execution_role_arn: Option<String>,
}

/// Everything needed to start one transcription job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub job_name: String,
    pub media_uri: String,
    /// `None` lets the service detect the format.
    pub media_format: Option<String>,
    pub language_code: String,
    /// Container the service writes `"{job_name}.json"` into.
    pub output_container: String,
    pub vocabulary_name: Option<String>,
    pub settings: JobSettings,
}

#[async_trait]
pub trait TranscriptionService: Send + Sync {
    async fn submit_job(&self, request: &SubmitRequest) -> Result<Job, ServiceError>;

    async fn get_job(&self, name: &str) -> Result<Job, ServiceError>;

    /// Every job whose name starts with `name_prefix`, in service order.
    async fn list_jobs(&self, name_prefix: &str) -> Result<Vec<Job>, ServiceError>;

    async fn delete_job(&self, name: &str) -> Result<(), ServiceError>;

    async fn create_vocabulary(
        &self,
        name: &str,
        language_code: &str,
        phrases: &[String],
    ) -> Result<(), ServiceError>;

    async fn get_vocabulary(&self, name: &str) -> Result<VocabularyState, ServiceError>;
}

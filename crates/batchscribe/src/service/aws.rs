//! Amazon Transcribe batch jobs and custom vocabularies.

use async_trait::async_trait;
use aws_sdk_transcribe::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_transcribe::primitives::DateTime as AwsDateTime;
use aws_sdk_transcribe::types::{
    JobExecutionSettings, LanguageCode, Media, MediaFormat, Settings, TranscriptionJob,
    TranscriptionJobSummary,
};
use aws_sdk_transcribe::Client;
use chrono::{DateTime, Utc};

use crate::error::ServiceError;
use crate::job::{Job, JobStatus, VocabularyState};
use crate::service::{SubmitRequest, TranscriptionService};

pub struct AwsTranscribeService {
    client: Client,
}

impl AwsTranscribeService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(sdk_config))
    }
}

fn map_sdk_error<E, R>(subject: &str, err: SdkError<E, R>) -> ServiceError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = err.message().unwrap_or_default().to_string();
    match err.code() {
        Some("NotFoundException") => ServiceError::NotFound(subject.to_string()),
        // Missing jobs and vocabularies come back as bad requests.
        Some("BadRequestException") if message.contains("couldn't be found") => {
            ServiceError::NotFound(subject.to_string())
        }
        Some("LimitExceededException") | Some("ThrottlingException") => {
            ServiceError::Throttled(message)
        }
        Some("ConflictException") => ServiceError::Conflict(message),
        _ => ServiceError::Request(DisplayErrorContext(&err).to_string()),
    }
}

fn to_chrono(value: Option<&AwsDateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
}

fn parse_status(value: Option<&str>) -> JobStatus {
    match value {
        Some("COMPLETED") => JobStatus::Completed,
        Some("FAILED") => JobStatus::Failed,
        Some("QUEUED") => JobStatus::Queued,
        _ => JobStatus::InProgress,
    }
}

fn job_from_detail(job: &TranscriptionJob) -> Job {
    let name = job.transcription_job_name().unwrap_or_default();
    let mut result = Job::new(
        name,
        parse_status(job.transcription_job_status().map(|s| s.as_str())),
    );
    result.creation_time = to_chrono(job.creation_time());
    result.start_time = to_chrono(job.start_time());
    result.completion_time = to_chrono(job.completion_time());
    result.language_code = job.language_code().map(|l| l.as_str().to_string());
    result.failure_reason = job.failure_reason().map(str::to_string);
    result
}

fn job_from_summary(summary: &TranscriptionJobSummary) -> Job {
    let name = summary.transcription_job_name().unwrap_or_default();
    let mut result = Job::new(
        name,
        parse_status(summary.transcription_job_status().map(|s| s.as_str())),
    );
    result.creation_time = to_chrono(summary.creation_time());
    result.start_time = to_chrono(summary.start_time());
    result.completion_time = to_chrono(summary.completion_time());
    result.language_code = summary.language_code().map(|l| l.as_str().to_string());
    result.output_location_type = summary.output_location_type().map(|o| o.as_str().to_string());
    result.failure_reason = summary.failure_reason().map(str::to_string);
    result
}

fn build_settings(request: &SubmitRequest) -> Settings {
    let settings = &request.settings;
    Settings::builder()
        .set_vocabulary_name(request.vocabulary_name.clone())
        .show_speaker_labels(settings.max_speaker_labels.is_some())
        .set_max_speaker_labels(settings.max_speaker_labels.map(i32::from))
        .show_alternatives(settings.max_alternatives.is_some())
        .set_max_alternatives(settings.max_alternatives.map(i32::from))
        .build()
}

#[async_trait]
impl TranscriptionService for AwsTranscribeService {
    async fn submit_job(&self, request: &SubmitRequest) -> Result<Job, ServiceError> {
        let execution = request.settings.deferred_execution_role_arn.as_ref().map(|arn| {
            JobExecutionSettings::builder()
                .allow_deferred_execution(true)
                .data_access_role_arn(arn)
                .build()
        });

        let output = self
            .client
            .start_transcription_job()
            .transcription_job_name(&request.job_name)
            .language_code(LanguageCode::from(request.language_code.as_str()))
            .set_media_format(request.media_format.as_deref().map(MediaFormat::from))
            .media(Media::builder().media_file_uri(&request.media_uri).build())
            .output_bucket_name(&request.output_container)
            .settings(build_settings(request))
            .set_job_execution_settings(execution)
            .send()
            .await
            .map_err(|e| map_sdk_error(&request.job_name, e))?;

        log::info!("Started transcription job {}", request.job_name);
        Ok(output
            .transcription_job()
            .map(job_from_detail)
            .unwrap_or_else(|| Job::new(request.job_name.clone(), JobStatus::Queued)))
    }

    async fn get_job(&self, name: &str) -> Result<Job, ServiceError> {
        let output = self
            .client
            .get_transcription_job()
            .transcription_job_name(name)
            .send()
            .await
            .map_err(|e| map_sdk_error(name, e))?;

        output
            .transcription_job()
            .map(job_from_detail)
            .ok_or_else(|| ServiceError::NotFound(name.to_string()))
    }

    async fn list_jobs(&self, name_prefix: &str) -> Result<Vec<Job>, ServiceError> {
        let mut jobs = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_transcription_jobs()
                .job_name_contains(name_prefix)
                .max_results(100)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| map_sdk_error(name_prefix, e))?;

            jobs.extend(
                output
                    .transcription_job_summaries()
                    .iter()
                    .map(job_from_summary)
                    // The service matches anywhere in the name.
                    .filter(|job| job.name.starts_with(name_prefix)),
            );

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        log::debug!("Listed {} jobs with prefix {}", jobs.len(), name_prefix);
        Ok(jobs)
    }

    async fn delete_job(&self, name: &str) -> Result<(), ServiceError> {
        self.client
            .delete_transcription_job()
            .transcription_job_name(name)
            .send()
            .await
            .map_err(|e| map_sdk_error(name, e))?;
        log::debug!("Deleted transcription job {}", name);
        Ok(())
    }

    async fn create_vocabulary(
        &self,
        name: &str,
        language_code: &str,
        phrases: &[String],
    ) -> Result<(), ServiceError> {
        self.client
            .create_vocabulary()
            .vocabulary_name(name)
            .language_code(LanguageCode::from(language_code))
            .set_phrases(Some(phrases.to_vec()))
            .send()
            .await
            .map_err(|e| map_sdk_error(name, e))?;
        log::info!("Requested vocabulary {}", name);
        Ok(())
    }

    async fn get_vocabulary(&self, name: &str) -> Result<VocabularyState, ServiceError> {
        let output = self
            .client
            .get_vocabulary()
            .vocabulary_name(name)
            .send()
            .await
            .map_err(|e| map_sdk_error(name, e))?;

        Ok(match output.vocabulary_state().map(|s| s.as_str()) {
            Some("READY") => VocabularyState::Ready,
            Some("FAILED") => VocabularyState::Failed,
            _ => VocabularyState::Pending,
        })
    }
}

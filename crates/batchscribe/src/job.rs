use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a transcription job as reported by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// `Completed` and `Failed` are final; nothing transitions out of them.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build state of a custom vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VocabularyState {
    Pending,
    Ready,
    Failed,
}

impl VocabularyState {
    pub fn is_terminal(self) -> bool {
        matches!(self, VocabularyState::Ready | VocabularyState::Failed)
    }
}

/// Snapshot of one remote transcription job. Only the remote service
/// mutates jobs; the pipeline observes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub status: JobStatus,
    pub creation_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub completion_time: Option<DateTime<Utc>>,
    pub language_code: Option<String>,
    /// Where the service wrote the result, e.g. `CUSTOMER_BUCKET`.
    pub output_location_type: Option<String>,
    /// Present only when `status` is `Failed`.
    pub failure_reason: Option<String>,
}

impl Job {
    /// A freshly submitted job with no timing information yet.
    pub fn new(name: impl Into<String>, status: JobStatus) -> Self {
        Self {
            name: name.into(),
            status,
            creation_time: None,
            start_time: None,
            completion_time: None,
            language_code: None,
            output_location_type: None,
            failure_reason: None,
        }
    }
}

/// Derives every run-scoped remote name from the configured job prefix.
///
/// Job names are `"{prefix}-{object key}"`, so a rerun derives the same name
/// for the same source object and duplicate submissions can be detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNaming {
    prefix: String,
}

impl JobNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The prefix shared by every job of this run, separator included.
    pub fn job_name_prefix(&self) -> String {
        format!("{}-", self.prefix)
    }

    pub fn job_name(&self, object_key: &str) -> String {
        format!("{}-{}", self.prefix, object_key)
    }

    pub fn vocabulary_name(&self, vocabulary: &str) -> String {
        format!("{}-{}", self.prefix, vocabulary)
    }

    /// Recovers the source object key from a job name (or a result object's
    /// base name). Only the exact `"{prefix}-"` head is removed; returns
    /// `None` when the name does not belong to this run or nothing remains.
    pub fn source_key<'a>(&self, job_name: &'a str) -> Option<&'a str> {
        let rest = job_name.strip_prefix(self.prefix.as_str())?;
        let key = rest.strip_prefix('-')?;
        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }

    pub fn owns(&self, job_name: &str) -> bool {
        self.source_key(job_name).is_some()
    }
}

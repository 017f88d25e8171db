//! In-process transcription service with scripted job outcomes.
//!
//! Jobs stay `IN_PROGRESS` for a configurable number of status polls and
//! then settle on their scripted outcome. Completed jobs write a result
//! object into the output container when a result store is attached, the
//! same way the real service does.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::ServiceError;
use crate::export::TranscriptDocument;
use crate::job::{Job, JobStatus, VocabularyState};
use crate::service::{SubmitRequest, TranscriptionService};
use crate::storage::ObjectStore;

/// How a simulated job ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Complete { transcript: String },
    Fail { reason: String },
    /// Never leaves `IN_PROGRESS`.
    Stall,
    /// Every status query for the job fails.
    StatusError(ServiceError),
}

/// Counts of calls made against the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub submitted: Vec<String>,
    pub deleted: Vec<String>,
    pub vocabularies_created: Vec<String>,
    pub status_polls: usize,
}

struct SimulatedJob {
    job: Job,
    output_container: String,
    polls_left: u32,
}

struct SimulatedVocabulary {
    state: VocabularyState,
    polls_left: u32,
}

#[derive(Default)]
struct State {
    jobs: Vec<SimulatedJob>,
    vocabularies: HashMap<String, SimulatedVocabulary>,
    outcomes: HashMap<String, Outcome>,
    calls: CallLog,
}

pub struct SimulatedTranscriptionService {
    state: Mutex<State>,
    result_store: Option<Arc<dyn ObjectStore>>,
    polls_before_terminal: u32,
}

impl SimulatedTranscriptionService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            result_store: None,
            polls_before_terminal: 1,
        }
    }

    /// Completed jobs write `"{job name}.json"` into their output container.
    pub fn with_result_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.result_store = Some(store);
        self
    }

    /// Number of status polls (jobs and vocabularies) answered with a
    /// non-terminal state before the outcome applies.
    pub fn with_polls_before_terminal(mut self, polls: u32) -> Self {
        self.polls_before_terminal = polls;
        self
    }

    /// Scripts the outcome of the job called `job_name`. Unscripted jobs
    /// complete with a generated transcript.
    pub fn script(&self, job_name: &str, outcome: Outcome) {
        if let Ok(mut state) = self.state.lock() {
            state.outcomes.insert(job_name.to_string(), outcome);
        }
    }

    /// Seeds a job that already exists on the service, e.g. from an earlier run.
    pub fn insert_job(&self, job: Job) {
        if let Ok(mut state) = self.state.lock() {
            state.jobs.push(SimulatedJob {
                job,
                output_container: String::new(),
                polls_left: 0,
            });
        }
    }

    pub fn insert_vocabulary(&self, name: &str, vocabulary_state: VocabularyState) {
        if let Ok(mut state) = self.state.lock() {
            state.vocabularies.insert(
                name.to_string(),
                SimulatedVocabulary {
                    state: vocabulary_state,
                    polls_left: 0,
                },
            );
        }
    }

    pub fn calls(&self) -> CallLog {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, ServiceError> {
        self.state
            .lock()
            .map_err(|_| ServiceError::Request("simulated service state poisoned".to_string()))
    }
}

impl Default for SimulatedTranscriptionService {
    fn default() -> Self {
        Self::new()
    }
}

/// A result object to write once the lock is released.
struct PendingResult {
    container: String,
    key: String,
    body: Vec<u8>,
}

#[async_trait]
impl TranscriptionService for SimulatedTranscriptionService {
    async fn submit_job(&self, request: &SubmitRequest) -> Result<Job, ServiceError> {
        let mut state = self.lock()?;
        if state.jobs.iter().any(|j| j.job.name == request.job_name) {
            return Err(ServiceError::Conflict(format!(
                "job {} already exists",
                request.job_name
            )));
        }
        if let Some(vocabulary) = &request.vocabulary_name {
            match state.vocabularies.get(vocabulary) {
                Some(v) if v.state == VocabularyState::Ready => {}
                _ => {
                    return Err(ServiceError::Request(format!(
                        "vocabulary {} is not ready",
                        vocabulary
                    )))
                }
            }
        }

        let mut job = Job::new(request.job_name.clone(), JobStatus::InProgress);
        job.creation_time = Some(Utc::now());
        job.language_code = Some(request.language_code.clone());

        state.calls.submitted.push(request.job_name.clone());
        state.jobs.push(SimulatedJob {
            job: job.clone(),
            output_container: request.output_container.clone(),
            polls_left: self.polls_before_terminal,
        });
        Ok(job)
    }

    async fn get_job(&self, name: &str) -> Result<Job, ServiceError> {
        let (job, pending) = {
            let mut state = self.lock()?;
            state.calls.status_polls += 1;
            let outcome = state.outcomes.get(name).cloned();

            let Some(entry) = state.jobs.iter_mut().find(|j| j.job.name == name) else {
                return Err(ServiceError::NotFound(name.to_string()));
            };

            if let Some(Outcome::StatusError(err)) = outcome {
                return Err(err);
            }

            let mut pending = None;
            if !entry.job.status.is_terminal() {
                if entry.job.start_time.is_none() {
                    entry.job.start_time = Some(Utc::now());
                }
                if entry.polls_left > 0 {
                    entry.polls_left -= 1;
                } else {
                    pending = settle(entry, outcome);
                }
            }
            (entry.job.clone(), pending)
        };

        if let (Some(result), Some(store)) = (pending, &self.result_store) {
            store
                .put_object(&result.container, &result.key, result.body)
                .await
                .map_err(|e| ServiceError::Request(e.to_string()))?;
        }
        Ok(job)
    }

    async fn list_jobs(&self, name_prefix: &str) -> Result<Vec<Job>, ServiceError> {
        let state = self.lock()?;
        Ok(state
            .jobs
            .iter()
            .filter(|j| j.job.name.starts_with(name_prefix))
            .map(|j| j.job.clone())
            .collect())
    }

    async fn delete_job(&self, name: &str) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        let before = state.jobs.len();
        state.jobs.retain(|j| j.job.name != name);
        if state.jobs.len() == before {
            return Err(ServiceError::NotFound(name.to_string()));
        }
        state.calls.deleted.push(name.to_string());
        Ok(())
    }

    async fn create_vocabulary(
        &self,
        name: &str,
        _language_code: &str,
        phrases: &[String],
    ) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        if state.vocabularies.contains_key(name) {
            return Err(ServiceError::Conflict(format!(
                "vocabulary {} already exists",
                name
            )));
        }
        let build_state = if phrases.is_empty() {
            VocabularyState::Failed
        } else {
            VocabularyState::Ready
        };
        state.vocabularies.insert(
            name.to_string(),
            SimulatedVocabulary {
                state: build_state,
                polls_left: self.polls_before_terminal,
            },
        );
        state.calls.vocabularies_created.push(name.to_string());
        Ok(())
    }

    async fn get_vocabulary(&self, name: &str) -> Result<VocabularyState, ServiceError> {
        let mut state = self.lock()?;
        let Some(vocabulary) = state.vocabularies.get_mut(name) else {
            return Err(ServiceError::NotFound(name.to_string()));
        };
        if vocabulary.polls_left > 0 {
            vocabulary.polls_left -= 1;
            return Ok(VocabularyState::Pending);
        }
        Ok(vocabulary.state)
    }
}

/// Applies the scripted outcome to a job whose polling budget ran out.
fn settle(entry: &mut SimulatedJob, outcome: Option<Outcome>) -> Option<PendingResult> {
    let outcome = outcome.unwrap_or_else(|| Outcome::Complete {
        transcript: format!("Simulated transcript for {}.", entry.job.name),
    });

    match outcome {
        Outcome::Complete { transcript } => {
            entry.job.status = JobStatus::Completed;
            entry.job.completion_time = Some(Utc::now());
            entry.job.output_location_type = Some("CUSTOMER_BUCKET".to_string());
            let body = serde_json::to_vec(&TranscriptDocument::from_text(
                &entry.job.name,
                &transcript,
            ))
            .unwrap_or_default();
            Some(PendingResult {
                container: entry.output_container.clone(),
                key: format!("{}.json", entry.job.name),
                body,
            })
        }
        Outcome::Fail { reason } => {
            entry.job.status = JobStatus::Failed;
            entry.job.failure_reason = Some(reason);
            entry.job.output_location_type = Some("CUSTOMER_BUCKET".to_string());
            None
        }
        Outcome::Stall | Outcome::StatusError(_) => None,
    }
}

//! Bounded polling for remote state changes.
//!
//! Both job completion and vocabulary readiness are waited on with the same
//! discipline: a fixed poll interval, a hard attempt budget, and status-query
//! errors propagated to the caller instead of retried.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{ServiceError, WaitError};
use crate::job::{JobStatus, VocabularyState};
use crate::service::TranscriptionService;

/// Default poll interval for job completion.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Default attempt budget; with the default interval this covers 20 minutes.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl WaitPolicy {
    pub fn new(poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            poll_interval,
            max_attempts,
        }
    }

    /// Upper bound on the time spent sleeping between polls.
    pub fn budget(&self) -> Duration {
        self.poll_interval * self.max_attempts
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_ATTEMPTS)
    }
}

/// Calls `check` until it yields `Some`, sleeping `poll_interval` between
/// attempts. There is no sleep after the last attempt.
async fn poll_until<T, F, Fut>(name: &str, policy: WaitPolicy, mut check: F) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ServiceError>>,
{
    if name.trim().is_empty() {
        return Err(WaitError::InvalidName);
    }

    for attempt in 1..=policy.max_attempts {
        if let Some(value) = check().await? {
            return Ok(value);
        }
        debug!(subject = %name, attempt, max_attempts = policy.max_attempts, "not terminal yet");
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.poll_interval).await;
        }
    }

    Err(WaitError::Timeout {
        name: name.to_string(),
        attempts: policy.max_attempts,
    })
}

/// Waits until the job reaches `COMPLETED` or `FAILED` and returns that
/// status. Callers re-query the job for its full record.
pub async fn wait_for_job(
    service: &dyn TranscriptionService,
    job_name: &str,
    policy: WaitPolicy,
) -> Result<JobStatus, WaitError> {
    poll_until(job_name, policy, || async {
        let job = service.get_job(job_name).await?;
        Ok::<_, ServiceError>(job.status.is_terminal().then_some(job.status))
    })
    .await
}

/// Waits until the vocabulary is usable. A vocabulary that fails to build
/// is reported as [`WaitError::VocabularyFailed`].
pub async fn wait_for_vocabulary(
    service: &dyn TranscriptionService,
    vocabulary_name: &str,
    policy: WaitPolicy,
) -> Result<(), WaitError> {
    let state = poll_until(vocabulary_name, policy, || async {
        let state = service.get_vocabulary(vocabulary_name).await?;
        Ok::<_, ServiceError>(state.is_terminal().then_some(state))
    })
    .await?;

    match state {
        VocabularyState::Ready => Ok(()),
        _ => Err(WaitError::VocabularyFailed(vocabulary_name.to_string())),
    }
}

//! Partitions a run's jobs by terminal status.

pub mod summary;

use crate::job::{Job, JobStatus};

pub use summary::{SummaryFiles, SummaryWriter};

/// Jobs of one listing, split by terminal status. Each input job lands in
/// exactly one of the three lists, in listing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub completed: Vec<Job>,
    pub failed: Vec<Job>,
    /// Jobs still queued or in progress; never reported.
    pub skipped: Vec<Job>,
}

impl Reconciliation {
    /// Names of every terminal job, the set eligible for cleanup.
    pub fn terminal_job_names(&self) -> Vec<String> {
        self.completed
            .iter()
            .chain(self.failed.iter())
            .map(|job| job.name.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.failed.is_empty()
    }
}

pub fn reconcile(jobs: Vec<Job>) -> Reconciliation {
    let mut result = Reconciliation::default();
    for job in jobs {
        match job.status {
            JobStatus::Completed => result.completed.push(job),
            JobStatus::Failed => result.failed.push(job),
            JobStatus::Queued | JobStatus::InProgress => result.skipped.push(job),
        }
    }
    result
}

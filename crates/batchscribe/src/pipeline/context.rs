use std::fmt;

use crate::archive::ArchiveSummary;
use crate::job::JobStatus;
use crate::reconcile::{Reconciliation, SummaryFiles};

use super::error::PipelineWarning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Init,
    Uploading,
    Submitting,
    Waiting,
    Reconciling,
    Archiving,
    Cleanup,
    Done,
    Aborted,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Init => "INIT",
            PipelineState::Uploading => "UPLOADING",
            PipelineState::Submitting => "SUBMITTING",
            PipelineState::Waiting => "WAITING",
            PipelineState::Reconciling => "RECONCILING",
            PipelineState::Archiving => "ARCHIVING",
            PipelineState::Cleanup => "CLEANUP",
            PipelineState::Done => "DONE",
            PipelineState::Aborted => "ABORTED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Aborted)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one run observed and did. Filled in state by state; a run that
/// aborted keeps everything gathered before the failure.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Unique per run; suffix of the summary report file names.
    pub run_token: String,
    pub final_state: PipelineState,
    /// State the run was in when it aborted.
    pub aborted_in: Option<PipelineState>,
    pub abort_reason: Option<String>,

    // Uploading
    pub uploaded: Vec<String>,

    // Submitting
    pub submitted: Vec<String>,
    /// Jobs that already existed under their derived name and were not resubmitted.
    pub already_submitted: Vec<String>,

    // Waiting
    pub terminal: Vec<(String, JobStatus)>,

    // Reconciling
    pub reconciliation: Option<Reconciliation>,
    pub summary_files: SummaryFiles,

    // Archiving
    pub archive: Option<ArchiveSummary>,

    // Cleanup
    pub deleted_jobs: Vec<String>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl RunReport {
    pub fn new(run_token: impl Into<String>) -> Self {
        Self {
            run_token: run_token.into(),
            final_state: PipelineState::Init,
            aborted_in: None,
            abort_reason: None,
            uploaded: Vec::new(),
            submitted: Vec::new(),
            already_submitted: Vec::new(),
            terminal: Vec::new(),
            reconciliation: None,
            summary_files: SummaryFiles::default(),
            archive: None,
            deleted_jobs: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.final_state == PipelineState::Aborted
    }

    /// Terminal status observed while waiting, if the job got that far.
    pub fn status_of(&self, job_name: &str) -> Option<JobStatus> {
        self.terminal
            .iter()
            .find(|(name, _)| name == job_name)
            .map(|(_, status)| *status)
    }
}

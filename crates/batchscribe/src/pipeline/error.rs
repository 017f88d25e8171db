use thiserror::Error;

/// A per-object or per-job failure that was isolated and logged; the run
/// carried on past it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    #[error("Upload of '{file}' failed: {error}")]
    UploadFailed { file: String, error: String },

    #[error("Vocabulary '{name}' unavailable: {error}")]
    VocabularyUnavailable { name: String, error: String },

    #[error("Submission of '{job_name}' failed: {error}")]
    SubmitFailed { job_name: String, error: String },

    #[error("Waiting for '{job_name}' failed: {error}")]
    WaitFailed { job_name: String, error: String },

    #[error("Reconciliation failed: {error}")]
    ReconcileFailed { error: String },

    #[error("Archival failed: {error}")]
    ArchiveFailed { error: String },

    #[error("Cleanup skipped: {reason}")]
    CleanupSkipped { reason: String },

    #[error("Deleting job '{job_name}' failed: {error}")]
    DeleteFailed { job_name: String, error: String },
}

pub mod archive;
pub mod config;
pub mod error;
pub mod export;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod reconcile;
pub mod sanitize;
pub mod service;
pub mod storage;
pub mod waiter;

pub use archive::{ArchivalCoordinator, ArchiveLocation, ArchiveOutcome, ArchiveSummary};
pub use config::{load_config, load_config_from_str, Config};
pub use error::{
    BatchscribeError, ConfigError, ExportError, ReportError, Result, ServiceError, SetupError,
    StorageError, WaitError,
};
pub use export::{DocumentRenderer, DocxRenderer, TranscriptDocument};
pub use job::{Job, JobNaming, JobStatus, VocabularyState};
pub use pipeline::{Pipeline, PipelineConfig, PipelineState, RunReport};
pub use reconcile::{reconcile, Reconciliation, SummaryFiles, SummaryWriter};
pub use service::{SimulatedTranscriptionService, SubmitRequest, TranscriptionService};
pub use storage::{LocalObjectStore, ObjectStore};
pub use waiter::{wait_for_job, wait_for_vocabulary, WaitPolicy};

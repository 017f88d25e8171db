//! Run controller sequencing upload, submission, waiting, reconciliation,
//! archival and cleanup.

pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod runner;

pub use config::PipelineConfig;
pub use context::{PipelineState, RunReport};
pub use error::PipelineWarning;
pub use progress::{LogProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::Pipeline;

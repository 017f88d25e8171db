use tracing::info;

use crate::job::JobStatus;

use super::context::PipelineState;

/// Events emitted by the pipeline while a run progresses.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    State {
        state: PipelineState,
        message: String,
    },
    JobSubmitted {
        job_name: String,
    },
    JobFinished {
        job_name: String,
        status: JobStatus,
    },
    Finished {
        final_state: PipelineState,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Writes every event to the log; used by the command-line binary.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::State { state, message } => {
                info!(state = %state, "{}", message);
            }
            ProgressEvent::JobSubmitted { job_name } => {
                info!(job_name = %job_name, "Job submitted");
            }
            ProgressEvent::JobFinished { job_name, status } => {
                info!(job_name = %job_name, status = %status, "Job finished");
            }
            ProgressEvent::Finished { final_state } => {
                info!(final_state = %final_state, "Run finished");
            }
        }
    }
}

//! CSV job summary reports, one file per status category per run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::ReportError;
use crate::job::Job;
use crate::reconcile::Reconciliation;

const COMPLETED_HEADER: [&str; 7] = [
    "TranscriptionJobName",
    "CreationTime",
    "StartTime",
    "CompletionTime",
    "LanguageCode",
    "TranscriptionJobStatus",
    "OutputLocationType",
];

const FAILED_HEADER: [&str; 7] = [
    "TranscriptionJobName",
    "CreationTime",
    "StartTime",
    "LanguageCode",
    "TranscriptionJobStatus",
    "FailureReason",
    "OutputLocationType",
];

/// Paths of the reports written for one run. An empty category writes no file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryFiles {
    pub completed: Option<PathBuf>,
    pub failed: Option<PathBuf>,
}

pub struct SummaryWriter {
    output_directory: PathBuf,
}

impl SummaryWriter {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    /// Report file path for a category; `run_token` keeps concurrent runs
    /// from overwriting each other.
    pub fn report_path(&self, category: &str, run_token: &str) -> PathBuf {
        self.output_directory
            .join(format!("job_summary_{}_{}.csv", category, run_token))
    }

    pub fn write(
        &self,
        reconciliation: &Reconciliation,
        run_token: &str,
    ) -> Result<SummaryFiles, ReportError> {
        std::fs::create_dir_all(&self.output_directory).map_err(|e| {
            ReportError::CreateDirectory {
                path: self.output_directory.clone(),
                source: e,
            }
        })?;

        let mut files = SummaryFiles::default();

        if !reconciliation.completed.is_empty() {
            let path = self.report_path("completed", run_token);
            write_rows(
                &path,
                &COMPLETED_HEADER,
                reconciliation.completed.iter().map(completed_row),
            )?;
            files.completed = Some(path);
        }

        if !reconciliation.failed.is_empty() {
            let path = self.report_path("failed", run_token);
            write_rows(
                &path,
                &FAILED_HEADER,
                reconciliation.failed.iter().map(failed_row),
            )?;
            files.failed = Some(path);
        }

        Ok(files)
    }
}

fn write_rows(
    path: &Path,
    header: &[&str],
    rows: impl Iterator<Item = [String; 7]>,
) -> Result<(), ReportError> {
    let to_report_error = |source: csv::Error| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(to_report_error)?;
    writer.write_record(header).map_err(to_report_error)?;
    for row in rows {
        writer.write_record(&row).map_err(to_report_error)?;
    }
    writer
        .flush()
        .map_err(|e| to_report_error(csv::Error::from(e)))?;
    Ok(())
}

fn completed_row(job: &Job) -> [String; 7] {
    [
        job.name.clone(),
        timestamp(job.creation_time),
        timestamp(job.start_time),
        timestamp(job.completion_time),
        text(&job.language_code),
        job.status.to_string(),
        text(&job.output_location_type),
    ]
}

fn failed_row(job: &Job) -> [String; 7] {
    [
        job.name.clone(),
        timestamp(job.creation_time),
        timestamp(job.start_time),
        text(&job.language_code),
        job.status.to_string(),
        text(&job.failure_reason),
        text(&job.output_location_type),
    ]
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map(|t| t.to_rfc3339()).unwrap_or_default()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

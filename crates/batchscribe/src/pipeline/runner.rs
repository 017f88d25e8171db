use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::archive::{ArchivalCoordinator, ArchiveLocation};
use crate::error::{SetupError, WaitError};
use crate::export::DocumentRenderer;
use crate::job::{JobNaming, JobStatus, VocabularyState};
use crate::reconcile::{reconcile, Reconciliation, SummaryWriter};
use crate::sanitize;
use crate::service::{SubmitRequest, TranscriptionService};
use crate::storage::{is_top_level, ObjectStore};
use crate::waiter::{wait_for_job, wait_for_vocabulary};

use super::config::PipelineConfig;
use super::context::{PipelineState, RunReport};
use super::error::PipelineWarning;
use super::progress::{ProgressEvent, ProgressReporter};

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    service: Arc<dyn TranscriptionService>,
    store: Arc<dyn ObjectStore>,
    renderer: Arc<dyn DocumentRenderer>,
    naming: JobNaming,
}

impl Pipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        service: Arc<dyn TranscriptionService>,
        store: Arc<dyn ObjectStore>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        let naming = JobNaming::new(config.job_prefix.clone());
        Self {
            config,
            service,
            store,
            renderer,
            naming,
        }
    }

    pub fn naming(&self) -> &JobNaming {
        &self.naming
    }

    /// Runs the pipeline once. Never fails: per-object and per-job errors
    /// become warnings, and an unrecoverable setup failure ends the run in
    /// [`PipelineState::Aborted`].
    pub async fn run(&self, progress: &dyn ProgressReporter) -> RunReport {
        let started = Utc::now();
        let mut report = RunReport::new(run_token(started));
        let location = ArchiveLocation::today(self.config.archive_prefix.clone());

        let span = info_span!("pipeline",
            run_token = %report.run_token,
            prefix = %self.naming.prefix(),
        );

        async {
            info!(started_at = %started.to_rfc3339(), "Run started");

            match self.execute(&mut report, &location, progress).await {
                Ok(()) => report.final_state = PipelineState::Done,
                Err(e) => {
                    error!(state = %report.final_state, error = %e, "Run aborted");
                    report.aborted_in = Some(report.final_state);
                    report.abort_reason = Some(e.to_string());
                    report.final_state = PipelineState::Aborted;
                }
            }

            progress.report(ProgressEvent::Finished {
                final_state: report.final_state,
            });
            let finished = Utc::now();
            info!(
                finished_at = %finished.to_rfc3339(),
                elapsed_secs = (finished - started).num_seconds(),
                warnings = report.warnings.len(),
                "Run ended"
            );
        }
        .instrument(span)
        .await;

        report
    }

    async fn execute(
        &self,
        report: &mut RunReport,
        location: &ArchiveLocation,
        progress: &dyn ProgressReporter,
    ) -> Result<(), SetupError> {
        // Uploading
        enter(report, progress, PipelineState::Uploading, "Uploading input files");
        self.step_upload(report)
            .instrument(info_span!("uploading"))
            .await?;

        // Submitting
        enter(report, progress, PipelineState::Submitting, "Submitting transcription jobs");
        let pending = self
            .step_submit(report, progress)
            .instrument(info_span!("submitting"))
            .await?;

        // Waiting
        enter(report, progress, PipelineState::Waiting, "Waiting for jobs to finish");
        self.step_wait(report, pending, progress)
            .instrument(info_span!("waiting"))
            .await;

        // Reconciling
        enter(report, progress, PipelineState::Reconciling, "Reconciling job outcomes");
        let reconciled = self
            .step_reconcile(report)
            .instrument(info_span!("reconciling"))
            .await;

        // Archiving
        enter(report, progress, PipelineState::Archiving, "Exporting and archiving results");
        self.step_archive(report, location)
            .instrument(info_span!("archiving", archive = %location.prefix()))
            .await;

        // Cleanup
        enter(report, progress, PipelineState::Cleanup, "Deleting reconciled job records");
        match reconciled {
            Some(reconciliation) => {
                self.step_cleanup(report, &reconciliation)
                    .instrument(info_span!("cleanup"))
                    .await
            }
            None => {
                warn!("Summaries were not written, keeping job records");
                report.warnings.push(PipelineWarning::CleanupSkipped {
                    reason: "summaries were not written".to_string(),
                });
            }
        }

        Ok(())
    }

    async fn step_upload(&self, report: &mut RunReport) -> Result<(), SetupError> {
        let config = &self.config;
        for container in [&config.input_container, &config.output_container] {
            self.store
                .create_container_if_absent(container, &config.region)
                .await
                .map_err(|e| SetupError::Container {
                    container: container.clone(),
                    source: e,
                })?;
        }

        let files = sanitize::sanitize_directory(&config.input_directory)?;
        for path in files {
            let key = sanitize::redact_path(&path);
            match self.store.upload(&config.input_container, &key, &path).await {
                Ok(()) => {
                    debug!(key = %key, "Uploaded");
                    report.uploaded.push(key);
                }
                Err(e) => {
                    warn!(file = %key, error = %e, "Upload failed");
                    report.warnings.push(PipelineWarning::UploadFailed {
                        file: key,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(uploaded = report.uploaded.len(), "Upload finished");
        Ok(())
    }

    /// Submits one job per top-level input object and returns the names of
    /// every job that still has to be waited on.
    async fn step_submit(
        &self,
        report: &mut RunReport,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<String>, SetupError> {
        let config = &self.config;
        let keys: Vec<String> = self
            .store
            .list_objects(&config.input_container, None)
            .await
            .map_err(|e| SetupError::ListInputs {
                container: config.input_container.clone(),
                source: e,
            })?
            .into_iter()
            .filter(|key| is_top_level(key))
            .collect();

        // Duplicate-submission guard: derived names make earlier jobs visible.
        let existing = self
            .service
            .list_jobs(&self.naming.job_name_prefix())
            .await
            .map_err(SetupError::Service)?;
        let existing_names: HashSet<String> = existing.iter().map(|j| j.name.clone()).collect();
        let mut pending: Vec<String> = existing
            .iter()
            .filter(|j| !j.status.is_terminal())
            .map(|j| j.name.clone())
            .collect();

        let vocabulary = if keys
            .iter()
            .any(|key| !existing_names.contains(&self.naming.job_name(key)))
        {
            self.ensure_vocabulary().await
        } else {
            Ok(None)
        };
        if let (Err(e), Some(vocabulary_config)) = (&vocabulary, &config.vocabulary) {
            warn!(error = %e, "Vocabulary unavailable, dependent jobs will not be submitted");
            report.warnings.push(PipelineWarning::VocabularyUnavailable {
                name: self.naming.vocabulary_name(&vocabulary_config.name),
                error: e.to_string(),
            });
        }

        for key in keys {
            let job_name = self.naming.job_name(&key);
            if existing_names.contains(&job_name) {
                info!(job_name = %job_name, "Job already exists, not resubmitting");
                report.already_submitted.push(job_name);
                continue;
            }

            let vocabulary_name = match &vocabulary {
                Ok(name) => name.clone(),
                Err(e) => {
                    report.warnings.push(PipelineWarning::SubmitFailed {
                        job_name,
                        error: format!("vocabulary unavailable: {}", e),
                    });
                    continue;
                }
            };

            let request = SubmitRequest {
                job_name: job_name.clone(),
                media_uri: self.store.object_uri(&config.input_container, &key),
                media_format: config.media_format.clone(),
                language_code: config.language_code.clone(),
                output_container: config.output_container.clone(),
                vocabulary_name,
                settings: config.settings.clone(),
            };

            match self.service.submit_job(&request).await {
                Ok(_) => {
                    progress.report(ProgressEvent::JobSubmitted {
                        job_name: job_name.clone(),
                    });
                    report.submitted.push(job_name.clone());
                    pending.push(job_name);
                }
                Err(e) => {
                    warn!(job_name = %job_name, error = %e, "Submission failed");
                    report.warnings.push(PipelineWarning::SubmitFailed {
                        job_name,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            submitted = report.submitted.len(),
            already_submitted = report.already_submitted.len(),
            "Submission finished"
        );
        Ok(pending)
    }

    /// Creates the run's vocabulary if absent and waits until it is ready.
    async fn ensure_vocabulary(&self) -> Result<Option<String>, WaitError> {
        let Some(vocabulary) = &self.config.vocabulary else {
            return Ok(None);
        };
        let name = self.naming.vocabulary_name(&vocabulary.name);

        match self.service.get_vocabulary(&name).await {
            Ok(VocabularyState::Failed) => return Err(WaitError::VocabularyFailed(name)),
            Ok(state) => debug!(vocabulary = %name, state = ?state, "Vocabulary exists"),
            Err(e) if e.is_not_found() => {
                info!(vocabulary = %name, phrases = vocabulary.phrases.len(), "Creating vocabulary");
                self.service
                    .create_vocabulary(&name, &self.config.language_code, &vocabulary.phrases)
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }

        wait_for_vocabulary(self.service.as_ref(), &name, self.config.wait_policy).await?;
        Ok(Some(name))
    }

    async fn step_wait(
        &self,
        report: &mut RunReport,
        job_names: Vec<String>,
        progress: &dyn ProgressReporter,
    ) {
        let service = self.service.as_ref();
        let policy = self.config.wait_policy;

        let results: Vec<(String, Result<JobStatus, WaitError>)> = stream::iter(job_names)
            .map(|job_name| async move {
                let span = info_span!("wait_job", job_name = %job_name);
                let result = wait_for_job(service, &job_name, policy).instrument(span).await;
                (job_name, result)
            })
            .buffer_unordered(self.config.wait_concurrency)
            .collect()
            .await;

        for (job_name, result) in results {
            match result {
                Ok(status) => {
                    progress.report(ProgressEvent::JobFinished {
                        job_name: job_name.clone(),
                        status,
                    });
                    report.terminal.push((job_name, status));
                }
                Err(e) => {
                    warn!(job_name = %job_name, error = %e, "Gave up waiting for job");
                    report.warnings.push(PipelineWarning::WaitFailed {
                        job_name,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    /// Returns the reconciliation only once its summaries are on disk.
    async fn step_reconcile(&self, report: &mut RunReport) -> Option<Reconciliation> {
        let jobs = match self.service.list_jobs(&self.naming.job_name_prefix()).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(error = %e, "Failed to list jobs");
                report.warnings.push(PipelineWarning::ReconcileFailed {
                    error: e.to_string(),
                });
                return None;
            }
        };

        let reconciliation = reconcile(jobs);
        info!(
            completed = reconciliation.completed.len(),
            failed = reconciliation.failed.len(),
            skipped = reconciliation.skipped.len(),
            "Jobs reconciled"
        );
        report.reconciliation = Some(reconciliation.clone());

        let writer = SummaryWriter::new(&self.config.output_directory);
        match writer.write(&reconciliation, &report.run_token) {
            Ok(files) => {
                info!(
                    completed_report = ?files.completed,
                    failed_report = ?files.failed,
                    "Summaries written"
                );
                report.summary_files = files;
                Some(reconciliation)
            }
            Err(e) => {
                warn!(error = %e, "Failed to write summaries");
                report.warnings.push(PipelineWarning::ReconcileFailed {
                    error: e.to_string(),
                });
                None
            }
        }
    }

    async fn step_archive(&self, report: &mut RunReport, location: &ArchiveLocation) {
        let coordinator = ArchivalCoordinator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.renderer),
            self.naming.clone(),
            self.config.input_container.clone(),
            self.config.output_container.clone(),
            &self.config.output_directory,
            location.clone(),
        );

        match coordinator.run().await {
            Ok(summary) => {
                for object in summary.objects.iter() {
                    debug!(result_key = %object.result_key, outcome = ?object.outcome, "Archive outcome");
                }
                report.archive = Some(summary);
            }
            Err(e) => {
                warn!(error = %e, "Failed to list result objects");
                report.warnings.push(PipelineWarning::ArchiveFailed {
                    error: e.to_string(),
                });
            }
        }
    }

    async fn step_cleanup(&self, report: &mut RunReport, reconciliation: &Reconciliation) {
        for job_name in reconciliation.terminal_job_names() {
            match self.service.delete_job(&job_name).await {
                Ok(()) => report.deleted_jobs.push(job_name),
                Err(e) => {
                    warn!(job_name = %job_name, error = %e, "Failed to delete job");
                    report.warnings.push(PipelineWarning::DeleteFailed {
                        job_name,
                        error: e.to_string(),
                    });
                }
            }
        }
        info!(deleted = report.deleted_jobs.len(), "Cleanup finished");
    }
}

fn enter(
    report: &mut RunReport,
    progress: &dyn ProgressReporter,
    state: PipelineState,
    message: &str,
) {
    report.final_state = state;
    progress.report(ProgressEvent::State {
        state,
        message: message.to_string(),
    });
}

/// Nanosecond start timestamp; keeps report names of concurrent runs apart.
fn run_token(started: DateTime<Utc>) -> String {
    started
        .timestamp_nanos_opt()
        .unwrap_or_else(|| started.timestamp_micros())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::DocxRenderer;
    use crate::job::Job;
    use crate::pipeline::progress::NoopProgress;
    use crate::service::{JobSettings, Outcome, SimulatedTranscriptionService};
    use crate::storage::LocalObjectStore;
    use crate::waiter::WaitPolicy;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    struct RecordingProgress {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn report(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn test_config(root: &Path) -> PipelineConfig {
        PipelineConfig {
            input_directory: root.join("audio"),
            output_directory: root.join("reports"),
            input_container: "media-in".to_string(),
            output_container: "media-out".to_string(),
            region: "local".to_string(),
            job_prefix: "run".to_string(),
            language_code: "en-US".to_string(),
            media_format: None,
            vocabulary: None,
            settings: JobSettings::default(),
            archive_prefix: "archive".to_string(),
            wait_policy: WaitPolicy::new(Duration::from_secs(1), 5),
            wait_concurrency: 2,
        }
    }

    fn setup(files: &[&str]) -> (TempDir, Arc<LocalObjectStore>, PipelineConfig) {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        std::fs::create_dir_all(&config.input_directory).unwrap();
        for file in files {
            std::fs::write(config.input_directory.join(file), b"audio").unwrap();
        }
        let store = Arc::new(LocalObjectStore::new(temp_dir.path().join("store")));
        (temp_dir, store, config)
    }

    fn pipeline(
        config: PipelineConfig,
        service: Arc<SimulatedTranscriptionService>,
        store: Arc<LocalObjectStore>,
    ) -> Pipeline {
        Pipeline::new(Arc::new(config), service, store, Arc::new(DocxRenderer::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_reaches_done() {
        let (_temp_dir, store, config) = setup(&["one.mp3", "two.mp3"]);
        let service = Arc::new(SimulatedTranscriptionService::new().with_result_store(store.clone()));
        let progress = RecordingProgress {
            events: Mutex::new(Vec::new()),
        };

        let report = pipeline(config, service.clone(), store.clone())
            .run(&progress)
            .await;

        assert_eq!(report.final_state, PipelineState::Done);
        assert_eq!(report.uploaded, vec!["one.mp3", "two.mp3"]);
        assert_eq!(report.submitted, vec!["run-one.mp3", "run-two.mp3"]);
        assert_eq!(report.archive.as_ref().unwrap().archived(), 2);
        assert_eq!(report.deleted_jobs.len(), 2);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        let states: Vec<PipelineState> = progress
            .events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::State { state, .. } => Some(*state),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                PipelineState::Uploading,
                PipelineState::Submitting,
                PipelineState::Waiting,
                PipelineState::Reconciling,
                PipelineState::Archiving,
                PipelineState::Cleanup,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_input_directory_aborts() {
        let (_temp_dir, store, config) = setup(&[]);
        std::fs::remove_dir_all(&config.input_directory).unwrap();
        let service = Arc::new(SimulatedTranscriptionService::new());

        let report = pipeline(config, service.clone(), store).run(&NoopProgress).await;

        assert!(report.is_aborted());
        assert_eq!(report.aborted_in, Some(PipelineState::Uploading));
        assert!(service.calls().submitted.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_job_is_not_resubmitted() {
        let (_temp_dir, store, config) = setup(&["one.mp3"]);
        let service = Arc::new(SimulatedTranscriptionService::new().with_result_store(store.clone()));
        service.insert_job(Job::new("run-one.mp3", JobStatus::Completed));

        let report = pipeline(config, service.clone(), store).run(&NoopProgress).await;

        assert_eq!(report.already_submitted, vec!["run-one.mp3"]);
        assert!(service.calls().submitted.is_empty());
        assert_eq!(report.final_state, PipelineState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_job_does_not_block_others() {
        let (_temp_dir, store, config) = setup(&["stuck.mp3", "fine.mp3"]);
        let service = Arc::new(SimulatedTranscriptionService::new().with_result_store(store.clone()));
        service.script("run-stuck.mp3", Outcome::Stall);

        let report = pipeline(config, service.clone(), store).run(&NoopProgress).await;

        assert_eq!(report.status_of("run-fine.mp3"), Some(JobStatus::Completed));
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            PipelineWarning::WaitFailed { job_name, .. } if job_name == "run-stuck.mp3"
        )));
        // The stuck job is neither reported nor deleted.
        assert_eq!(report.deleted_jobs, vec!["run-fine.mp3"]);
    }

    #[test]
    fn test_run_token_is_nanoseconds() {
        let started = DateTime::parse_from_rfc3339("2026-01-02T03:04:05.000000006Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(run_token(started), "1767323045000000006");
    }
}

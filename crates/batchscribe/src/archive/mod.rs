//! Export-then-archive of completed transcription results.
//!
//! Each result object goes through four steps: the export gate (download
//! and parse, skip empty transcripts), document export, archival of the
//! source object in the input container, and archival of the result object
//! in the output container. Archival is a copy-then-delete move that treats
//! an already-absent object as done, so rerunning over a partially archived
//! run converges instead of failing.

mod location;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::{ExportError, StorageError};
use crate::export::{DocumentRenderer, TranscriptDocument};
use crate::job::JobNaming;
use crate::storage::{is_top_level, move_object, ObjectStore};

pub use location::ArchiveLocation;

const RESULT_SUFFIX: &str = ".json";

/// What happened to one result object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Exported and both objects archived (or found already archived).
    Archived { document: PathBuf },
    /// The transcript was empty; nothing was exported or archived.
    SkippedEmptyTranscript,
    /// Export failed; nothing was archived.
    ExportFailed(String),
    /// Export succeeded but a move failed; a rerun retries the object.
    ArchiveFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectReport {
    pub result_key: String,
    pub outcome: ArchiveOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub objects: Vec<ObjectReport>,
}

impl ArchiveSummary {
    pub fn archived(&self) -> usize {
        self.count(|o| matches!(o, ArchiveOutcome::Archived { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ArchiveOutcome::SkippedEmptyTranscript))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                ArchiveOutcome::ExportFailed(_) | ArchiveOutcome::ArchiveFailed(_)
            )
        })
    }

    fn count(&self, pred: impl Fn(&ArchiveOutcome) -> bool) -> usize {
        self.objects.iter().filter(|r| pred(&r.outcome)).count()
    }
}

pub struct ArchivalCoordinator {
    store: Arc<dyn ObjectStore>,
    renderer: Arc<dyn DocumentRenderer>,
    naming: JobNaming,
    input_container: String,
    output_container: String,
    output_directory: PathBuf,
    location: ArchiveLocation,
}

impl ArchivalCoordinator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        renderer: Arc<dyn DocumentRenderer>,
        naming: JobNaming,
        input_container: impl Into<String>,
        output_container: impl Into<String>,
        output_directory: impl AsRef<Path>,
        location: ArchiveLocation,
    ) -> Self {
        Self {
            store,
            renderer,
            naming,
            input_container: input_container.into(),
            output_container: output_container.into(),
            output_directory: output_directory.as_ref().to_path_buf(),
            location,
        }
    }

    pub fn location(&self) -> &ArchiveLocation {
        &self.location
    }

    /// Result objects of this run: top-level `.json` keys of the output
    /// container whose name carries the run's job-name prefix.
    pub async fn result_objects(&self) -> Result<Vec<String>, StorageError> {
        let prefix = self.naming.job_name_prefix();
        let keys = self
            .store
            .list_objects(&self.output_container, Some(&prefix))
            .await?;
        Ok(keys
            .into_iter()
            .filter(|key| is_top_level(key) && key.ends_with(RESULT_SUFFIX))
            .collect())
    }

    /// Processes every result object. Only a failure to list the output
    /// container is returned; per-object failures are recorded in the summary.
    pub async fn run(&self) -> Result<ArchiveSummary, StorageError> {
        let mut summary = ArchiveSummary::default();
        for result_key in self.result_objects().await? {
            let span = info_span!("archive_object", result_key = %result_key);
            let outcome = self.archive_object(&result_key).instrument(span).await;
            summary.objects.push(ObjectReport { result_key, outcome });
        }

        info!(
            archived = summary.archived(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            archive = %self.location.prefix(),
            "Archival finished"
        );
        Ok(summary)
    }

    pub async fn archive_object(&self, result_key: &str) -> ArchiveOutcome {
        let job_name = result_key.strip_suffix(RESULT_SUFFIX).unwrap_or(result_key);
        let Some(source_key) = self.naming.source_key(job_name) else {
            warn!("Result object does not belong to this run");
            return ArchiveOutcome::ArchiveFailed(format!(
                "cannot derive source key from '{}'",
                result_key
            ));
        };

        // Steps A and B: nothing is archived unless the export went through.
        let document = match self.export(result_key).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                info!("Transcript is empty, skipping export and archival");
                return ArchiveOutcome::SkippedEmptyTranscript;
            }
            Err(e) => {
                warn!(error = %e, "Export failed");
                return ArchiveOutcome::ExportFailed(e.to_string());
            }
        };

        // Step C. The result object is the handle for deriving the source
        // key, so it stays in place when the source move fails.
        if let Err(e) = self.archive(&self.input_container, source_key).await {
            warn!(source_key, error = %e, "Failed to archive source object");
            return ArchiveOutcome::ArchiveFailed(e.to_string());
        }

        // Step D.
        if let Err(e) = self.archive(&self.output_container, result_key).await {
            warn!(error = %e, "Failed to archive result object");
            return ArchiveOutcome::ArchiveFailed(e.to_string());
        }

        info!(source_key, document = %document.display(), "Archived");
        ArchiveOutcome::Archived { document }
    }

    /// Returns `Ok(None)` when the transcript is empty.
    async fn export(&self, result_key: &str) -> Result<Option<PathBuf>, ExportError> {
        let bytes = self
            .store
            .get_object_bytes(&self.output_container, result_key)
            .await
            .map_err(ExportError::Download)?;

        let transcript = TranscriptDocument::from_slice(&bytes)?;
        if !transcript.has_text() {
            return Ok(None);
        }

        tokio::fs::create_dir_all(&self.output_directory)
            .await
            .map_err(|e| ExportError::WriteDocument {
                path: self.output_directory.clone(),
                source: e,
            })?;
        let json_path = self.output_directory.join(result_key);
        tokio::fs::write(&json_path, &bytes)
            .await
            .map_err(|e| ExportError::WriteDocument {
                path: json_path.clone(),
                source: e,
            })?;

        let renderer = Arc::clone(&self.renderer);
        let document = tokio::task::spawn_blocking(move || renderer.render(&json_path))
            .await
            .map_err(|e| ExportError::Render(e.to_string()))??;
        Ok(Some(document))
    }

    /// Moves `key` into the archive location of the same container. An
    /// absent object was archived by an earlier attempt and counts as done.
    async fn archive(&self, container: &str, key: &str) -> Result<(), StorageError> {
        let archive_key = self.location.key_for(key);
        match move_object(self.store.as_ref(), container, key, container, &archive_key).await {
            Ok(()) => {
                debug!(container, key, archive_key = %archive_key, "Moved to archive");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!(container, key, "Object not found, already archived");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::DocxRenderer;
    use crate::storage::LocalObjectStore;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    struct FailingRenderer;

    impl DocumentRenderer for FailingRenderer {
        fn render(&self, _transcript_json: &Path) -> Result<PathBuf, ExportError> {
            Err(ExportError::Render("renderer unavailable".to_string()))
        }
    }

    /// Local store whose copies of one source key fail with a backend error.
    struct DenyingStore {
        inner: Arc<LocalObjectStore>,
        denied_key: String,
    }

    #[async_trait::async_trait]
    impl ObjectStore for DenyingStore {
        async fn create_container_if_absent(
            &self,
            container: &str,
            region: &str,
        ) -> Result<(), StorageError> {
            self.inner.create_container_if_absent(container, region).await
        }

        async fn list_objects(
            &self,
            container: &str,
            prefix: Option<&str>,
        ) -> Result<Vec<String>, StorageError> {
            self.inner.list_objects(container, prefix).await
        }

        async fn upload(
            &self,
            container: &str,
            key: &str,
            local_path: &Path,
        ) -> Result<(), StorageError> {
            self.inner.upload(container, key, local_path).await
        }

        async fn put_object(
            &self,
            container: &str,
            key: &str,
            bytes: Vec<u8>,
        ) -> Result<(), StorageError> {
            self.inner.put_object(container, key, bytes).await
        }

        async fn download(
            &self,
            container: &str,
            key: &str,
            local_path: &Path,
        ) -> Result<(), StorageError> {
            self.inner.download(container, key, local_path).await
        }

        async fn get_object_bytes(
            &self,
            container: &str,
            key: &str,
        ) -> Result<Vec<u8>, StorageError> {
            self.inner.get_object_bytes(container, key).await
        }

        async fn copy(
            &self,
            src_container: &str,
            src_key: &str,
            dst_container: &str,
            dst_key: &str,
        ) -> Result<(), StorageError> {
            if src_key == self.denied_key {
                return Err(StorageError::Backend("access denied".to_string()));
            }
            self.inner
                .copy(src_container, src_key, dst_container, dst_key)
                .await
        }

        async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError> {
            self.inner.delete(container, key).await
        }

        fn object_uri(&self, container: &str, key: &str) -> String {
            self.inner.object_uri(container, key)
        }
    }

    struct Fixture {
        _temp_dir: TempDir,
        store: Arc<LocalObjectStore>,
        output_directory: PathBuf,
    }

    impl Fixture {
        async fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let store = Arc::new(LocalObjectStore::new(temp_dir.path().join("store")));
            store.create_container_if_absent("in", "local").await.unwrap();
            store.create_container_if_absent("out", "local").await.unwrap();
            let output_directory = temp_dir.path().join("output");
            Self {
                _temp_dir: temp_dir,
                store,
                output_directory,
            }
        }

        fn coordinator(&self, renderer: Arc<dyn DocumentRenderer>) -> ArchivalCoordinator {
            self.coordinator_with_store(self.store.clone(), renderer)
        }

        fn coordinator_with_store(
            &self,
            store: Arc<dyn ObjectStore>,
            renderer: Arc<dyn DocumentRenderer>,
        ) -> ArchivalCoordinator {
            ArchivalCoordinator::new(
                store,
                renderer,
                JobNaming::new("run"),
                "in",
                "out",
                &self.output_directory,
                ArchiveLocation::new("archive", NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()),
            )
        }

        async fn seed(&self, source_key: &str, transcript: &str) {
            self.store
                .put_object("in", source_key, b"audio".to_vec())
                .await
                .unwrap();
            let job_name = format!("run-{}", source_key);
            let body =
                serde_json::to_vec(&TranscriptDocument::from_text(&job_name, transcript)).unwrap();
            self.store
                .put_object("out", &format!("{}.json", job_name), body)
                .await
                .unwrap();
        }

        async fn keys(&self, container: &str) -> Vec<String> {
            self.store.list_objects(container, None).await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_archives_source_and_result() {
        let fixture = Fixture::new().await;
        fixture.seed("call.mp3", "hello there").await;

        let summary = fixture
            .coordinator(Arc::new(DocxRenderer::new()))
            .run()
            .await
            .unwrap();

        assert_eq!(summary.archived(), 1);
        assert_eq!(fixture.keys("in").await, vec!["archive/2026-01-15/call.mp3"]);
        assert_eq!(
            fixture.keys("out").await,
            vec!["archive/2026-01-15/run-call.mp3.json"]
        );
        assert!(fixture.output_directory.join("run-call.mp3.docx").is_file());
        assert!(fixture.output_directory.join("run-call.mp3.json").is_file());
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let fixture = Fixture::new().await;
        fixture.seed("call.mp3", "hello there").await;
        let coordinator = fixture.coordinator(Arc::new(DocxRenderer::new()));

        coordinator.run().await.unwrap();
        let after_first = (fixture.keys("in").await, fixture.keys("out").await);

        let summary = coordinator.run().await.unwrap();
        assert!(summary.objects.is_empty());
        assert_eq!((fixture.keys("in").await, fixture.keys("out").await), after_first);
    }

    #[tokio::test]
    async fn test_missing_source_is_tolerated() {
        let fixture = Fixture::new().await;
        fixture.seed("call.mp3", "hello there").await;
        fixture.store.delete("in", "call.mp3").await.unwrap();

        let outcome = fixture
            .coordinator(Arc::new(DocxRenderer::new()))
            .archive_object("run-call.mp3.json")
            .await;

        assert!(matches!(outcome, ArchiveOutcome::Archived { .. }));
        assert!(fixture.keys("in").await.is_empty());
        assert_eq!(
            fixture.keys("out").await,
            vec!["archive/2026-01-15/run-call.mp3.json"]
        );
    }

    #[tokio::test]
    async fn test_empty_transcript_is_neither_exported_nor_archived() {
        let fixture = Fixture::new().await;
        fixture.seed("silence.mp3", "   ").await;

        let summary = fixture
            .coordinator(Arc::new(DocxRenderer::new()))
            .run()
            .await
            .unwrap();

        assert_eq!(summary.skipped(), 1);
        assert_eq!(fixture.keys("in").await, vec!["silence.mp3"]);
        assert_eq!(fixture.keys("out").await, vec!["run-silence.mp3.json"]);
        assert!(!fixture.output_directory.join("run-silence.mp3.docx").exists());
    }

    #[tokio::test]
    async fn test_export_failure_leaves_objects_in_place() {
        let fixture = Fixture::new().await;
        fixture.seed("a.mp3", "first").await;
        fixture.seed("b.mp3", "second").await;

        let summary = fixture
            .coordinator(Arc::new(FailingRenderer))
            .run()
            .await
            .unwrap();

        assert_eq!(summary.failed(), 2);
        assert_eq!(fixture.keys("in").await, vec!["a.mp3", "b.mp3"]);
    }

    #[tokio::test]
    async fn test_ignores_foreign_and_nested_objects() {
        let fixture = Fixture::new().await;
        fixture.seed("call.mp3", "hello").await;
        fixture
            .store
            .put_object("out", "other-call.mp3.json", b"{}".to_vec())
            .await
            .unwrap();
        fixture
            .store
            .put_object("out", "run-notes.txt", b"x".to_vec())
            .await
            .unwrap();

        let keys = fixture
            .coordinator(Arc::new(DocxRenderer::new()))
            .result_objects()
            .await
            .unwrap();
        assert_eq!(keys, vec!["run-call.mp3.json"]);
    }

    #[tokio::test]
    async fn test_prefix_is_stripped_exactly() {
        let fixture = Fixture::new().await;
        // A source key that itself starts with the prefix characters.
        fixture.seed("run-run.mp3", "hello").await;

        let outcome = fixture
            .coordinator(Arc::new(DocxRenderer::new()))
            .archive_object("run-run-run.mp3.json")
            .await;

        assert!(matches!(outcome, ArchiveOutcome::Archived { .. }));
        assert_eq!(
            fixture.keys("in").await,
            vec!["archive/2026-01-15/run-run.mp3"]
        );
    }

    #[tokio::test]
    async fn test_storage_failure_is_isolated_to_its_object() {
        let fixture = Fixture::new().await;
        fixture.seed("a.mp3", "first").await;
        fixture.seed("b.mp3", "second").await;
        let store = Arc::new(DenyingStore {
            inner: fixture.store.clone(),
            denied_key: "a.mp3".to_string(),
        });

        let summary = fixture
            .coordinator_with_store(store, Arc::new(DocxRenderer::new()))
            .run()
            .await
            .unwrap();

        assert_eq!(summary.objects.len(), 2);
        assert_eq!(summary.objects[0].result_key, "run-a.mp3.json");
        assert!(matches!(
            &summary.objects[0].outcome,
            ArchiveOutcome::ArchiveFailed(message) if message.contains("access denied")
        ));
        assert!(matches!(
            summary.objects[1].outcome,
            ArchiveOutcome::Archived { .. }
        ));

        // The failed source move leaves both objects of that pair in place.
        assert_eq!(
            fixture.keys("in").await,
            vec!["a.mp3", "archive/2026-01-15/b.mp3"]
        );
        assert_eq!(
            fixture.keys("out").await,
            vec!["archive/2026-01-15/run-b.mp3.json", "run-a.mp3.json"]
        );
    }
}

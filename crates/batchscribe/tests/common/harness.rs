//! Test harness for isolated pipeline runs.
//!
//! Every harness owns a temporary directory holding the local input files,
//! the report/export output directory and the root of a `LocalObjectStore`.
//! The simulated transcription service writes its result objects into that
//! same store.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use batchscribe::pipeline::NoopProgress;
use batchscribe::{
    DocxRenderer, LocalObjectStore, ObjectStore, Pipeline, PipelineConfig, RunReport,
    SimulatedTranscriptionService,
};

use super::builders::PipelineConfigBuilder;

pub struct TestHarness {
    temp_dir: TempDir,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub store: Arc<LocalObjectStore>,
    pub service: Arc<SimulatedTranscriptionService>,
}

impl TestHarness {
    /// Jobs settle after one in-progress status poll.
    pub fn new() -> Self {
        Self::with_polls_before_terminal(1)
    }

    pub fn with_polls_before_terminal(polls: u32) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let input_dir = base.join("input");
        let output_dir = base.join("output");
        std::fs::create_dir_all(&input_dir).expect("Failed to create input dir");

        let store = Arc::new(LocalObjectStore::new(base.join("store")));
        let service = Arc::new(
            SimulatedTranscriptionService::new()
                .with_result_store(store.clone())
                .with_polls_before_terminal(polls),
        );

        Self {
            temp_dir,
            input_dir,
            output_dir,
            store,
            service,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a local media file into the input directory.
    pub fn write_input(&self, filename: &str) -> PathBuf {
        let path = self.input_dir.join(filename);
        std::fs::write(&path, format!("audio:{}", filename)).expect("Failed to write input file");
        path
    }

    pub fn config(&self) -> PipelineConfigBuilder {
        PipelineConfigBuilder::new(&self.input_dir, &self.output_dir)
    }

    pub fn pipeline(&self, config: PipelineConfig) -> Pipeline {
        Pipeline::new(
            Arc::new(config),
            self.service.clone(),
            self.store.clone(),
            Arc::new(DocxRenderer::new()),
        )
    }

    pub async fn run(&self, config: PipelineConfig) -> RunReport {
        self.pipeline(config).run(&NoopProgress).await
    }

    pub async fn keys(&self, container: &str) -> Vec<String> {
        self.store
            .list_objects(container, None)
            .await
            .expect("Failed to list container")
    }

    /// Keys below the archive prefix, without the date partition.
    pub async fn archived(&self, container: &str) -> Vec<String> {
        self.keys(container)
            .await
            .into_iter()
            .filter_map(|key| {
                let rest = key.strip_prefix("archive/")?;
                let (_date, name) = rest.split_once('/')?;
                Some(name.to_string())
            })
            .collect()
    }

    /// Data rows of a summary CSV, header excluded.
    pub fn read_report(&self, path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::Reader::from_path(path).expect("Failed to open report");
        reader
            .records()
            .map(|r| {
                r.expect("Malformed report row")
                    .iter()
                    .map(str::to_string)
                    .collect()
            })
            .collect()
    }
}

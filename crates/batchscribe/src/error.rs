use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchscribeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transcription service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Wait error: {0}")]
    Wait(#[from] WaitError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Failure calling the remote transcription service (jobs or vocabularies).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("'{0}' not found")]
    NotFound(String),

    #[error("Request throttled: {0}")]
    Throttled(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object '{key}' not found in '{container}'")]
    NotFound { container: String, key: String },

    #[error("Invalid object key '{0}'")]
    InvalidKey(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Absent objects are expected during archival and are tolerated there.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

#[derive(Error, Debug)]
pub enum WaitError {
    #[error("'{name}' did not reach a terminal state after {attempts} attempts")]
    Timeout { name: String, attempts: u32 },

    #[error("Status query failed: {0}")]
    Remote(#[from] ServiceError),

    #[error("Vocabulary '{0}' failed to build")]
    VocabularyFailed(String),

    #[error("Cannot wait on an empty name")]
    InvalidName,
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to download result object: {0}")]
    Download(#[source] StorageError),

    #[error("Failed to read transcript '{path}': {source}")]
    ReadTranscript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse transcript: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to render document: {0}")]
    Render(String),

    #[error("Failed to write document '{path}': {source}")]
    WriteDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to create report directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write report '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Unrecoverable setup failure; the only error that aborts a whole run.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Cannot prepare container '{container}': {source}")]
    Container {
        container: String,
        #[source]
        source: StorageError,
    },

    #[error("Cannot list input container '{container}': {source}")]
    ListInputs {
        container: String,
        #[source]
        source: StorageError,
    },

    #[error("Cannot read input directory '{path}': {reason}")]
    InputDirectory { path: PathBuf, reason: String },

    #[error("Cannot reach transcription service: {0}")]
    Service(#[source] ServiceError),
}

pub type Result<T> = std::result::Result<T, BatchscribeError>;

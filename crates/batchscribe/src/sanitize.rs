//! Input file-name sanitization and helpers for span attributes.
//!
//! Object keys double as job names, and the transcription service only
//! accepts a narrow character set there, so every character outside
//! `[A-Za-z0-9.]` in a file stem becomes `-` before upload.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::SetupError;

static RE_UNSAFE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9.]").unwrap());

/// `"my call (1).mp3"` → `"my-call--1-.mp3"`. The extension is kept as is.
pub fn sanitize_file_name(file_name: &str) -> String {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let clean_stem = RE_UNSAFE.replace_all(&stem, "-");
    match path.extension() {
        Some(ext) => format!("{}.{}", clean_stem, ext.to_string_lossy()),
        None => clean_stem.into_owned(),
    }
}

/// Renames every regular file directly inside `directory` to its sanitized
/// name and returns the resulting paths, sorted. A rename that would clobber
/// an existing file is skipped and the file keeps its name.
pub fn sanitize_directory(directory: &Path) -> Result<Vec<PathBuf>, SetupError> {
    let entries = std::fs::read_dir(directory).map_err(|e| SetupError::InputDirectory {
        path: directory.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SetupError::InputDirectory {
            path: directory.to_path_buf(),
            reason: e.to_string(),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let original = entry.file_name().to_string_lossy().into_owned();
        let clean = sanitize_file_name(&original);
        if clean == original {
            files.push(path);
            continue;
        }

        let target = directory.join(&clean);
        if target.exists() {
            warn!(file = %original, target = %clean, "Sanitized name already taken, keeping original");
            files.push(path);
            continue;
        }

        match std::fs::rename(&path, &target) {
            Ok(()) => {
                debug!(from = %original, to = %clean, "Renamed input file");
                files.push(target);
            }
            Err(e) => {
                warn!(file = %original, error = %e, "Failed to rename input file");
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields: reveals the file name without exposing the full path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

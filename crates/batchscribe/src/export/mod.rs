pub mod docx;
pub mod transcript;

use std::path::{Path, PathBuf};

use crate::error::ExportError;

pub use docx::DocxRenderer;
pub use transcript::{SpeakerTurn, TranscriptDocument};

/// Converts a downloaded transcript JSON file into a human-readable document
/// and returns the document's path.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, transcript_json: &Path) -> Result<PathBuf, ExportError>;
}

//! Result object model: the JSON transcript a completed job writes to the
//! output container.

use serde::{Deserialize, Serialize};

use crate::error::ExportError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptDocument {
    #[serde(default)]
    pub job_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub results: TranscriptResults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResults {
    #[serde(default)]
    pub transcripts: Vec<TranscriptText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_labels: Option<SpeakerLabels>,
    #[serde(default)]
    pub items: Vec<TranscriptItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptText {
    #[serde(default)]
    pub transcript: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeakerLabels {
    #[serde(default)]
    pub speakers: u32,
    #[serde(default)]
    pub segments: Vec<SpeakerSegment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeakerSegment {
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub speaker_label: String,
    #[serde(default)]
    pub items: Vec<SegmentItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentItem {
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub speaker_label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
    #[serde(default)]
    pub content: String,
}

/// Consecutive words attributed to one speaker.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerTurn {
    pub speaker: String,
    pub start_seconds: f64,
    pub text: String,
}

impl TranscriptDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ExportError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// A minimal result object holding only the plain transcript.
    pub fn from_text(job_name: &str, text: &str) -> Self {
        Self {
            job_name: job_name.to_string(),
            account_id: None,
            results: TranscriptResults {
                transcripts: vec![TranscriptText {
                    transcript: text.to_string(),
                }],
                speaker_labels: None,
                items: Vec::new(),
            },
            status: Some("COMPLETED".to_string()),
        }
    }

    /// The primary transcript, or `""` when the service produced none.
    pub fn transcript_text(&self) -> &str {
        self.results
            .transcripts
            .first()
            .map(|t| t.transcript.as_str())
            .unwrap_or("")
    }

    /// Whitespace-only transcripts count as empty.
    pub fn has_text(&self) -> bool {
        !self.transcript_text().trim().is_empty()
    }

    /// Groups words into speaker turns using the speaker segment items.
    /// Returns an empty list when the job ran without speaker labels.
    pub fn speaker_turns(&self) -> Vec<SpeakerTurn> {
        let Some(labels) = &self.results.speaker_labels else {
            return Vec::new();
        };

        let speaker_at: std::collections::HashMap<&str, &str> = labels
            .segments
            .iter()
            .flat_map(|segment| segment.items.iter())
            .map(|item| (item.start_time.as_str(), item.speaker_label.as_str()))
            .collect();

        let mut turns: Vec<SpeakerTurn> = Vec::new();
        for item in &self.results.items {
            let Some(word) = item.alternatives.first().map(|a| a.content.as_str()) else {
                continue;
            };

            if item.kind == "punctuation" {
                if let Some(turn) = turns.last_mut() {
                    turn.text.push_str(word);
                }
                continue;
            }

            let start = item.start_time.as_deref().unwrap_or_default();
            let speaker = speaker_at.get(start).copied().unwrap_or("unknown");

            match turns.last_mut() {
                Some(turn) if turn.speaker == speaker => {
                    turn.text.push(' ');
                    turn.text.push_str(word);
                }
                _ => turns.push(SpeakerTurn {
                    speaker: speaker.to_string(),
                    start_seconds: start.parse().unwrap_or(0.0),
                    text: word.to_string(),
                }),
            }
        }
        turns
    }
}

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;

use crate::error::ExportError;
use crate::export::transcript::{SpeakerTurn, TranscriptDocument};
use crate::export::DocumentRenderer;

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Renders a transcript JSON file into a Word document next to it
/// (`run-call.mp3.json` → `run-call.mp3.docx`).
pub struct DocxRenderer;

impl DocxRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentRenderer for DocxRenderer {
    fn render(&self, transcript_json: &Path) -> Result<PathBuf, ExportError> {
        let bytes = std::fs::read(transcript_json).map_err(|e| ExportError::ReadTranscript {
            path: transcript_json.to_path_buf(),
            source: e,
        })?;
        let transcript = TranscriptDocument::from_slice(&bytes)?;

        let document_xml = build_document_xml(&transcript)?;
        let save_as = transcript_json.with_extension("docx");
        write_package(&save_as, &document_xml)?;

        Ok(save_as)
    }
}

fn write_package(path: &Path, document_xml: &[u8]) -> Result<(), ExportError> {
    let file = std::fs::File::create(path).map_err(|e| ExportError::WriteDocument {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut archive = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let parts: [(&str, &[u8]); 3] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        ("word/document.xml", document_xml),
    ];

    for (name, content) in parts {
        archive
            .start_file(name, options)
            .map_err(|e| ExportError::Render(format!("Failed to add '{}': {}", name, e)))?;
        archive.write_all(content).map_err(|e| ExportError::WriteDocument {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    archive
        .finish()
        .map_err(|e| ExportError::Render(format!("Failed to finish DOCX: {}", e)))?;
    Ok(())
}

fn build_document_xml(transcript: &TranscriptDocument) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
    )?;
    emit(
        &mut writer,
        Event::Start(BytesStart::new("w:document").with_attributes([("xmlns:w", WORD_NS)])),
    )?;
    emit(&mut writer, Event::Start(BytesStart::new("w:body")))?;

    let title = if transcript.job_name.is_empty() {
        "Transcript".to_string()
    } else {
        format!("Transcript: {}", transcript.job_name)
    };
    paragraph(&mut writer, &title, true)?;

    let turns = transcript.speaker_turns();
    if turns.is_empty() {
        for text in &transcript.results.transcripts {
            paragraph(&mut writer, &text.transcript, false)?;
        }
    } else {
        for turn in &turns {
            paragraph(&mut writer, &format_turn_heading(turn), true)?;
            paragraph(&mut writer, &turn.text, false)?;
        }
    }

    emit(&mut writer, Event::End(BytesEnd::new("w:body")))?;
    emit(&mut writer, Event::End(BytesEnd::new("w:document")))?;

    Ok(writer.into_inner().into_inner())
}

fn paragraph(writer: &mut Writer<Cursor<Vec<u8>>>, text: &str, bold: bool) -> Result<(), ExportError> {
    emit(writer, Event::Start(BytesStart::new("w:p")))?;
    emit(writer, Event::Start(BytesStart::new("w:r")))?;
    if bold {
        emit(writer, Event::Start(BytesStart::new("w:rPr")))?;
        emit(writer, Event::Empty(BytesStart::new("w:b")))?;
        emit(writer, Event::End(BytesEnd::new("w:rPr")))?;
    }
    emit(
        writer,
        Event::Start(BytesStart::new("w:t").with_attributes([("xml:space", "preserve")])),
    )?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new("w:t")))?;
    emit(writer, Event::End(BytesEnd::new("w:r")))?;
    emit(writer, Event::End(BytesEnd::new("w:p")))?;
    Ok(())
}

fn emit(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), ExportError> {
    writer
        .write_event(event)
        .map_err(|e| ExportError::Render(format!("XML write error: {}", e)))
}

/// `[00:01:05] spk_0`
fn format_turn_heading(turn: &SpeakerTurn) -> String {
    let total = turn.start_seconds.max(0.0) as u64;
    format!(
        "[{:02}:{:02}:{:02}] {}",
        total / 3600,
        (total % 3600) / 60,
        total % 60,
        turn.speaker
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn read_document_xml(path: &Path) -> String {
        let file = std::fs::File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn test_render_plain_transcript() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join("run-memo.wav.json");
        let doc = TranscriptDocument::from_text("run-memo.wav", "Buy milk & eggs.");
        std::fs::write(&json_path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let docx = DocxRenderer::new().render(&json_path).unwrap();

        assert_eq!(docx, temp_dir.path().join("run-memo.wav.docx"));
        let xml = read_document_xml(&docx);
        assert!(xml.contains("Transcript: run-memo.wav"));
        assert!(xml.contains("Buy milk &amp; eggs."));
    }

    #[test]
    fn test_render_speaker_turns() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join("run-call.json");
        std::fs::write(
            &json_path,
            r#"{"jobName":"run-call","results":{
                "transcripts":[{"transcript":"Hi. Bye."}],
                "speaker_labels":{"speakers":2,"segments":[
                    {"start_time":"65.0","end_time":"66.0","speaker_label":"spk_0","items":[{"start_time":"65.0","end_time":"66.0","speaker_label":"spk_0"}]},
                    {"start_time":"70.0","end_time":"71.0","speaker_label":"spk_1","items":[{"start_time":"70.0","end_time":"71.0","speaker_label":"spk_1"}]}
                ]},
                "items":[
                    {"start_time":"65.0","end_time":"66.0","alternatives":[{"content":"Hi"}],"type":"pronunciation"},
                    {"alternatives":[{"content":"."}],"type":"punctuation"},
                    {"start_time":"70.0","end_time":"71.0","alternatives":[{"content":"Bye"}],"type":"pronunciation"}
                ]}}"#,
        )
        .unwrap();

        let docx = DocxRenderer::new().render(&json_path).unwrap();
        let xml = read_document_xml(&docx);
        assert!(xml.contains("[00:01:05] spk_0"));
        assert!(xml.contains("[00:01:10] spk_1"));
        assert!(xml.contains("Hi."));
    }

    #[test]
    fn test_render_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = DocxRenderer::new().render(&temp_dir.path().join("absent.json"));
        assert!(matches!(result, Err(ExportError::ReadTranscript { .. })));
    }
}

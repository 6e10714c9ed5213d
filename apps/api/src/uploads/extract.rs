//! Text extraction: turns an uploaded PDF, DOCX or plain-text file into a
//! string for the scorer. The scorer itself never sees file formats.

use std::io::{Cursor, Read};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::errors::AppError;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const TEXT_MIME: &str = "text/plain";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Pdf,
    Docx,
    PlainText,
}

impl FileKind {
    /// Detects the kind from the filename extension, falling back to the
    /// declared content type.
    pub fn detect(filename: &str, content_type: Option<&str>) -> Result<Self, AppError> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());

        let by_extension = match extension.as_deref() {
            Some("pdf") => Some(FileKind::Pdf),
            Some("docx") => Some(FileKind::Docx),
            Some("txt" | "md" | "text") => Some(FileKind::PlainText),
            _ => None,
        };
        if let Some(kind) = by_extension {
            return Ok(kind);
        }

        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());
        match mime.as_deref() {
            Some(PDF_MIME) => Ok(FileKind::Pdf),
            Some(DOCX_MIME) => Ok(FileKind::Docx),
            Some(TEXT_MIME | "text/markdown") => Ok(FileKind::PlainText),
            _ => Err(AppError::UnsupportedMediaType(format!(
                "'{filename}' is not a PDF, DOCX or plain-text file"
            ))),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            FileKind::Pdf => PDF_MIME,
            FileKind::Docx => DOCX_MIME,
            FileKind::PlainText => TEXT_MIME,
        }
    }
}

/// Extracts plain text from `bytes`. CPU-bound for PDFs; call from a
/// blocking context.
pub fn extract_text(kind: FileKind, bytes: &[u8]) -> Result<String, AppError> {
    match kind {
        FileKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| AppError::Extraction(format!("PDF: {e}"))),
        FileKind::Docx => extract_docx(bytes),
        FileKind::PlainText => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AppError::Extraction(format!("DOCX container: {e}")))?;
    let mut document = archive
        .by_name("word/document.xml")
        .map_err(|e| AppError::Extraction(format!("DOCX body: {e}")))?;

    let mut xml = String::new();
    document
        .read_to_string(&mut xml)
        .map_err(|e| AppError::Extraction(format!("DOCX body: {e}")))?;

    Ok(docx_xml_to_text(&xml))
}

/// Flattens WordprocessingML into text: paragraphs become lines, tabs and
/// breaks are kept, every other tag is dropped.
fn docx_xml_to_text(xml: &str) -> String {
    let with_breaks = xml
        .replace("</w:p>", "\n")
        .replace("<w:tab/>", "\t")
        .replace("<w:br/>", "\n");
    let stripped = tag_pattern().replace_all(&with_breaks, "");
    decode_entities(&stripped).trim().to_string()
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is a valid regex"))
}

fn decode_entities(text: &str) -> String {
    // &amp; last so "&amp;lt;" decodes to "&lt;" and not "<".
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// First `max_chars` characters of the trimmed text, or `None` when blank.
pub fn content_preview(text: &str, max_chars: usize) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(max_chars).collect())
}

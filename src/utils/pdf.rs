//! PDF utilities.
//!
//! Rendered text is produced with the pdf-extract crate. Only the first few
//! pages are kept since identifiers and titles live on the title page.
//! Embedded metadata (the document-information dictionary and the XMP
//! packet) is read with lopdf.

use lopdf::{Dictionary, Document, Object};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Characters kept per requested page when the extractor emits no page breaks
const CHARS_PER_PAGE: usize = 4000;

/// Errors that can occur during PDF extraction
#[derive(Debug, Error)]
pub enum PdfExtractError {
    #[error("Failed to extract text from PDF: {0}")]
    ExtractionFailed(String),

    #[error("File not found or not a valid PDF: {0}")]
    InvalidFile(String),
}

/// Extract the full text of a PDF file.
pub fn extract_text(path: &Path) -> Result<String, PdfExtractError> {
    if !path.is_file() {
        return Err(PdfExtractError::InvalidFile(format!(
            "Not a file: {}",
            path.display()
        )));
    }

    let text = pdf_extract::extract_text(path)
        .map_err(|e| PdfExtractError::ExtractionFailed(e.to_string()))?;

    if text.trim().is_empty() {
        // Scanned or image-only PDFs have no text layer
        tracing::debug!("Extracted empty text from PDF: {}", path.display());
    }

    Ok(text)
}

/// Extract the text of the first `pages` pages.
///
/// ```ignore
/// let text = extract_first_pages_text(Path::new("paper.pdf"), 2)?;
/// ```
pub fn extract_first_pages_text(path: &Path, pages: usize) -> Result<String, PdfExtractError> {
    let text = extract_text(path)?;
    Ok(first_pages(&text, pages))
}

/// Keep the first `pages` form-feed separated pages of `text`.
pub fn first_pages(text: &str, pages: usize) -> String {
    let pages = pages.max(1);

    if text.contains('\x0c') {
        return text
            .split('\x0c')
            .take(pages)
            .collect::<Vec<_>>()
            .join("\n");
    }

    text.chars().take(pages * CHARS_PER_PAGE).collect()
}

/// String values of a PDF document-information dictionary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfInfo {
    entries: BTreeMap<String, String>,
}

impl PdfInfo {
    /// Trimmed, non-empty value for `key` (e.g. `Title`, `Author`, `CreationDate`)
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Read the document-information dictionary, if the trailer has one.
pub fn read_info(document: &Document) -> Option<PdfInfo> {
    let dict = match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_object(*id).and_then(Object::as_dict).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };

    Some(PdfInfo {
        entries: dictionary_strings(dict),
    })
}

/// Read the catalog's XMP metadata packet as text.
pub fn read_xmp(document: &Document) -> Option<String> {
    let catalog = document.catalog().ok()?;
    let stream = match catalog.get(b"Metadata").ok()? {
        Object::Reference(id) => document.get_object(*id).and_then(Object::as_stream).ok()?,
        Object::Stream(stream) => stream,
        _ => return None,
    };

    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    Some(String::from_utf8_lossy(&content).into_owned())
}

/// Decode a PDF text string: UTF-16BE when it starts with the `FE FF` mark,
/// otherwise single-byte text.
pub fn decode_text_string(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        None => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn dictionary_strings(dict: &Dictionary) -> BTreeMap<String, String> {
    dict.iter()
        .filter_map(|(key, value)| {
            let bytes = value.as_str().ok()?;
            Some((
                String::from_utf8_lossy(key).into_owned(),
                decode_text_string(bytes),
            ))
        })
        .collect()
}

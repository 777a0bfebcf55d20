//! Document loading: file bytes to page texts.

use crate::types::Document;
use aidoc_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Leading bytes of every PDF file.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Page separator in plain-text documents.
const FORM_FEED: char = '\u{0C}';

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
}

impl DocumentFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "md" | "markdown" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// Turns a file into a [`Document`].
///
/// Loading is blocking; async callers run it on a blocking thread.
pub trait DocumentLoader: Send + Sync {
    /// Load a document.
    ///
    /// # Errors
    /// `AppError::DocumentLoad` if the file is missing, unreadable, of an
    /// unsupported type, or malformed.
    fn load(&self, path: &Path) -> AppResult<Document>;

    /// Whether `load` accepts this path at all.
    fn supports(&self, path: &Path) -> bool;
}

/// Loads PDF and plain-text files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl FileLoader {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentLoader for FileLoader {
    fn load(&self, path: &Path) -> AppResult<Document> {
        let format = DocumentFormat::from_path(path)
            .ok_or_else(|| AppError::document_load(path, "unsupported file type"))?;

        let bytes = fs::read(path).map_err(|e| AppError::document_load(path, e.to_string()))?;

        let pages = match format {
            DocumentFormat::Pdf => pdf_pages(path, &bytes)?,
            DocumentFormat::PlainText => text_pages(path, bytes)?,
        };

        let document = Document::new(document_id(path), pages);

        if document.pages.iter().all(|p| p.trim().is_empty()) {
            tracing::warn!("Document {:?} contains no extractable text", path);
        }

        tracing::debug!(
            "Loaded {:?}: {} pages, {} chars",
            path,
            document.pages.len(),
            document.char_count()
        );

        Ok(document)
    }

    fn supports(&self, path: &Path) -> bool {
        DocumentFormat::from_path(path).is_some()
    }
}

fn pdf_pages(path: &Path, bytes: &[u8]) -> AppResult<Vec<String>> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(AppError::document_load(path, "not a PDF file"));
    }

    // pdf-extract panics on some malformed inputs instead of returning an error
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(AppError::document_load(
            path,
            format!("PDF extraction failed: {}", e),
        )),
        Err(_) => Err(AppError::document_load(path, "PDF extraction failed")),
    }
}

fn text_pages(path: &Path, bytes: Vec<u8>) -> AppResult<Vec<String>> {
    let text = String::from_utf8(bytes)
        .map_err(|_| AppError::document_load(path, "file is not valid UTF-8 text"))?;

    Ok(text.split(FORM_FEED).map(str::to_string).collect())
}

/// The file name, falling back to the full path.
fn document_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

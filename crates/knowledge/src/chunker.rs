//! Text chunking with configurable size and overlap.
//!
//! Windows are measured in `char`s, so a code point is never split. Each page
//! is cut into windows of `max_len` characters, advancing `max_len - overlap`
//! characters per step; the last window of a page may be shorter.

use crate::types::{Document, Passage};
use aidoc_core::{AppError, AppResult};

/// Chunk documents into overlapping passages.
///
/// Ordinals run across all pages of a document, in page order. Empty or
/// whitespace-only pages produce no passages.
///
/// # Errors
/// `AppError::Config` unless `max_len > overlap`.
pub fn chunk(documents: &[Document], max_len: usize, overlap: usize) -> AppResult<Vec<Passage>> {
    if max_len == 0 || overlap >= max_len {
        return Err(AppError::Config(format!(
            "chunk size ({}) must be greater than overlap ({})",
            max_len, overlap
        )));
    }

    let step = max_len - overlap;
    let mut passages = Vec::new();

    for document in documents {
        let mut ordinal = 0u32;

        for (page_no, page) in document.pages.iter().enumerate() {
            if page.trim().is_empty() {
                continue;
            }

            let chars: Vec<char> = page.chars().collect();
            let mut start = 0;

            // No early exit once a window reaches the page end: a tail window
            // shorter than `overlap` lies inside its predecessor and is kept.
            while start < chars.len() {
                let end = (start + max_len).min(chars.len());

                passages.push(Passage {
                    text: chars[start..end].iter().collect(),
                    source: document.id.clone(),
                    ordinal,
                    page: page_no as u32,
                    offset: start,
                });

                ordinal += 1;
                start += step;
            }
        }

        tracing::debug!(
            "Chunked {} ({} pages) into {} passages",
            document.id,
            document.pages.len(),
            ordinal
        );
    }

    tracing::debug!(
        "Chunked {} documents into {} passages (size: {}, overlap: {})",
        documents.len(),
        passages.len(),
        max_len,
        overlap
    );

    Ok(passages)
}

//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A loaded source document: its identifier and ordered page texts.
///
/// Documents only live long enough to be chunked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Source identifier (the file name)
    pub id: String,

    /// Page texts in page order
    pub pages: Vec<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            id: id.into(),
            pages,
        }
    }

    /// Total number of characters across all pages.
    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.chars().count()).sum()
    }
}

/// A bounded slice of one document page, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Passage text
    pub text: String,

    /// Identifier of the source document
    pub source: String,

    /// Position within the source document, counted across pages
    pub ordinal: u32,

    /// Zero-based page the passage was cut from
    pub page: u32,

    /// Character offset of the passage within its page
    pub offset: usize,
}

/// Which index slot answered a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexSlot {
    /// The index built from the latest upload
    Uploaded,
    /// The lazily built default-corpus index
    Fallback,
}

impl IndexSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Fallback => "fallback",
        }
    }
}

/// Final answer to a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Synthesized answer text
    pub text: String,

    /// Index the supporting passages came from
    pub source: IndexSlot,
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    /// Accepted file names, in upload order
    pub files: Vec<String>,

    /// Number of passages in the new index
    pub passage_count: usize,

    /// Identifier of the installed index
    pub index_id: Uuid,

    /// When the index was installed
    pub indexed_at: DateTime<Utc>,
}

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// No upload yet and the fallback has not been built
    NoIndex,
    /// An uploaded index is installed
    ActiveReady,
    /// The fallback index is being built
    FallbackBuilding,
    /// The fallback index is built and no upload has happened
    FallbackReady,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoIndex => "no-index",
            Self::ActiveReady => "active-ready",
            Self::FallbackBuilding => "fallback-building",
            Self::FallbackReady => "fallback-ready",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Error types for AI-DOC.
//!
//! A single error enum covers configuration, document loading, the two
//! downstream model services, and the vector index invariants. The
//! presentation layer renders failures from [`AppError::kind`], never from
//! a formatted answer string.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for AI-DOC.
///
/// All fallible functions return `Result<T, AppError>`.
/// Library code never panics; failures are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad parameters or configuration (caller bug)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A source file could not be read or parsed
    #[error("Failed to load document {path:?}: {reason}")]
    DocumentLoad { path: PathBuf, reason: String },

    /// Embedding provider transport or quota failure
    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    /// Language model transport or quota failure during synthesis
    #[error("Synthesis service error: {0}")]
    SynthesisService(String),

    /// Vectors of different lengths in one index
    #[error("Dimension mismatch at vector {position}: expected {expected}, found {found}")]
    DimensionMismatch {
        expected: usize,
        found: usize,
        position: usize,
    },

    /// An operation that needs at least one item received none
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Query against an index with no passages
    #[error("Index contains no passages")]
    EmptyIndex,

    /// Retrieval found nothing and the session is configured to refuse
    #[error("No context found for question")]
    NoContext,

    /// Another build is already in flight
    #[error("Busy: {0}")]
    Busy(String),

    /// Raw LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Coarse error category for rendering and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    DocumentLoad,
    EmbeddingService,
    SynthesisService,
    DimensionMismatch,
    EmptyInput,
    EmptyIndex,
    NoContext,
    Busy,
    Internal,
}

impl ErrorKind {
    /// Stable label used in user-facing output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::DocumentLoad => "document-load",
            Self::EmbeddingService => "embedding-service",
            Self::SynthesisService => "synthesis-service",
            Self::DimensionMismatch => "dimension-mismatch",
            Self::EmptyInput => "empty-input",
            Self::EmptyIndex => "empty-index",
            Self::NoContext => "no-context",
            Self::Busy => "busy",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppError {
    /// Create a document load error for a path.
    pub fn document_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AppError::DocumentLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Config(_) | AppError::Prompt(_) => ErrorKind::Configuration,
            AppError::DocumentLoad { .. } => ErrorKind::DocumentLoad,
            AppError::EmbeddingService(_) => ErrorKind::EmbeddingService,
            AppError::SynthesisService(_) | AppError::Llm(_) => ErrorKind::SynthesisService,
            AppError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            AppError::EmptyInput(_) => ErrorKind::EmptyInput,
            AppError::EmptyIndex => ErrorKind::EmptyIndex,
            AppError::NoContext => ErrorKind::NoContext,
            AppError::Busy(_) => ErrorKind::Busy,
            AppError::Io(_) | AppError::Serialization(_) | AppError::Other(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

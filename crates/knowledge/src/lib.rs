//! Retrieval-augmented medical question answering.
//!
//! Ingestion path: documents → [`chunker`] → [`embeddings`] → [`vector_index`].
//! Query path: question → [`QaSession`] picks an index → [`retriever`] →
//! [`synthesizer`] → answer.

pub mod chunker;
pub mod corpus;
pub mod embeddings;
pub mod ingest;
pub mod loader;
pub mod retriever;
pub mod session;
pub mod synthesizer;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use corpus::{CorpusProvider, DirectoryCorpus, StaticCorpus};
pub use embeddings::{create_provider, Embedder, EmbeddingProvider};
pub use ingest::IngestPipeline;
pub use loader::{DocumentLoader, FileLoader};
pub use retriever::Retriever;
pub use session::QaSession;
pub use synthesizer::{AnswerStream, AnswerSynthesizer, SynthesisOptions};
pub use types::{Answer, Document, IndexSlot, Passage, SessionState, UploadSummary};
pub use vector_index::VectorIndex;

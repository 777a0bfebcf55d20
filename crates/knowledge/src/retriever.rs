//! Query path over a vector index: embed the question, fetch the top-k passages.

use crate::embeddings::Embedder;
use crate::types::Passage;
use crate::vector_index::VectorIndex;
use aidoc_core::{AppError, AppResult};

/// Embeds questions and looks them up in an index.
#[derive(Debug, Clone)]
pub struct Retriever {
    embedder: Embedder,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Embedder, top_k: usize) -> Self {
        Self { embedder, top_k }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve up to `top_k` passages, most relevant first.
    pub async fn retrieve(&self, question: &str, index: &VectorIndex) -> AppResult<Vec<Passage>> {
        self.retrieve_k(question, index, self.top_k).await
    }

    /// Retrieve up to `k` passages, most relevant first.
    ///
    /// # Errors
    /// `EmptyIndex` if the index holds no passages, otherwise whatever the
    /// embedder or [`VectorIndex::query`] reports.
    pub async fn retrieve_k(
        &self,
        question: &str,
        index: &VectorIndex,
        k: usize,
    ) -> AppResult<Vec<Passage>> {
        if index.is_empty() {
            return Err(AppError::EmptyIndex);
        }

        let query = self.embedder.embed_one(question).await?;
        let results = index.query(&query, k)?;

        tracing::debug!(
            "Retrieved {} passages from index {} (best distance: {:.3})",
            results.len(),
            index.id(),
            results.first().map(|(_, d)| *d).unwrap_or(f32::NAN)
        );

        Ok(results.into_iter().map(|(passage, _)| passage).collect())
    }
}

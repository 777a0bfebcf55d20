//! Ingestion pipeline: load, chunk, embed, build.
//!
//! Shared by uploads and the fallback build. Either the whole pass
//! succeeds and yields an index, or nothing is produced.

use crate::chunker::chunk;
use crate::embeddings::Embedder;
use crate::loader::DocumentLoader;
use crate::types::Document;
use crate::vector_index::VectorIndex;
use aidoc_core::config::{DistanceMetric, PipelineSettings};
use aidoc_core::{AppError, AppResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Builds vector indexes from documents.
#[derive(Clone)]
pub struct IngestPipeline {
    loader: Arc<dyn DocumentLoader>,
    embedder: Embedder,
    chunk_size: usize,
    chunk_overlap: usize,
    metric: DistanceMetric,
}

impl IngestPipeline {
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        embedder: Embedder,
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            loader,
            embedder,
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            metric: settings.distance,
        }
    }

    /// Load files on a blocking thread, failing on the first bad file.
    pub async fn load_files(&self, paths: Vec<PathBuf>) -> AppResult<Vec<Document>> {
        let loader = Arc::clone(&self.loader);

        tokio::task::spawn_blocking(move || {
            paths
                .iter()
                .map(|path| loader.load(path))
                .collect::<AppResult<Vec<_>>>()
        })
        .await
        .map_err(|e| AppError::Other(format!("Document loading task failed: {}", e)))?
    }

    /// Chunk, embed and index documents.
    pub async fn build_index(&self, documents: &[Document]) -> AppResult<VectorIndex> {
        let start = Instant::now();

        let passages = chunk(documents, self.chunk_size, self.chunk_overlap)?;
        if passages.is_empty() {
            return Err(AppError::EmptyInput(
                "documents contain no extractable text".to_string(),
            ));
        }

        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let index = VectorIndex::build(passages, vectors, self.metric)?;

        tracing::info!(
            "Built index {}: {} documents, {} passages, dimension {} in {:.2}s",
            index.id(),
            documents.len(),
            index.len(),
            index.dimension(),
            start.elapsed().as_secs_f64()
        );

        Ok(index)
    }
}

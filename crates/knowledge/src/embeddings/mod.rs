//! Embedding engine for passages and questions.
//!
//! [`Embedder`] wraps an [`EmbeddingProvider`] and adds batching and the
//! output-length check. It never retries: a provider failure surfaces as
//! `AppError::EmbeddingService` and retry policy belongs to the caller.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

use aidoc_core::{AppError, AppResult};
use std::sync::Arc;

/// Stateless, shareable embedding front end.
#[derive(Debug, Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl Embedder {
    /// Create an embedder sending at most `batch_size` texts per provider call.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    /// Dimension of every vector this embedder produces.
    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// Embed texts, preserving order: `result[i]` belongs to `texts[i]`.
    pub async fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            "Embedding {} texts using provider '{}' (model: {})",
            texts.len(),
            self.provider.provider_name(),
            self.provider.model_name()
        );

        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let embedded = self
                .provider
                .embed_batch(batch)
                .await
                .map_err(into_service_error)?;

            if embedded.len() != batch.len() {
                return Err(AppError::EmbeddingService(format!(
                    "provider '{}' returned {} vectors for {} texts",
                    self.provider.provider_name(),
                    embedded.len(),
                    batch.len()
                )));
            }

            vectors.extend(embedded);
        }

        Ok(vectors)
    }

    /// Embed a single query text.
    pub async fn embed_one(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| AppError::EmbeddingService("No embedding returned".to_string()))
    }
}

fn into_service_error(err: AppError) -> AppError {
    match err {
        AppError::EmbeddingService(_) => err,
        other => AppError::EmbeddingService(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and returns one constant vector per text.
    #[derive(Debug, Default)]
    struct CountingProvider {
        calls: AtomicUsize,
        drop_last: bool,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn provider_name(&self) -> &str {
            "counting"
        }

        fn model_name(&self) -> &str {
            "counting-v1"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut out: Vec<Vec<f32>> = texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect();
            if self.drop_last {
                out.pop();
            }
            Ok(out)
        }
    }

    #[tokio::test]
    async fn test_embed_batches_and_preserves_order() {
        let provider = Arc::new(CountingProvider::default());
        let embedder = Embedder::new(provider.clone(), 2);

        let texts: Vec<String> = ["a", "bb", "ccc", "dddd", "eeeee"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let vectors = embedder.embed(&texts).await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        let lengths: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        assert_eq!(lengths, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[tokio::test]
    async fn test_short_provider_output_is_service_error() {
        let provider = Arc::new(CountingProvider {
            drop_last: true,
            ..Default::default()
        });
        let embedder = Embedder::new(provider, 8);

        let err = embedder
            .embed(&["one".to_string(), "two".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmbeddingService(_)));
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let provider = Arc::new(CountingProvider::default());
        let embedder = Embedder::new(provider.clone(), 8);

        assert!(embedder.embed(&[]).await.unwrap().is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embed_one_matches_batch() {
        let embedder = Embedder::new(Arc::new(TrigramProvider::new(64)), 4);

        let single = embedder.embed_one("iron deficiency anemia").await.unwrap();
        let batch = embedder
            .embed(&["iron deficiency anemia".to_string()])
            .await
            .unwrap();
        assert_eq!(single, batch[0]);
        assert_eq!(embedder.dimensions(), 64);
    }
}

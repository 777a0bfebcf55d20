//! Trigram embedding provider using character trigram-based content-aware embeddings.

use crate::embeddings::provider::EmbeddingProvider;
use aidoc_core::AppResult;
use std::collections::{BTreeMap, HashSet};

const MODEL_NAME: &str = "trigram-v1";

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "how", "can", "does", "should", "there",
];

/// Trigram-based embedding provider for local, offline operation.
///
/// Words (lowercased, stop words and words under three characters removed)
/// are hashed into buckets, once for the whole word and once per character
/// trigram, and the resulting vector is normalized to unit length. Not
/// semantically accurate like a neural model, but deterministic and
/// good enough to rank passages that share vocabulary with a question.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
    stop_words: HashSet<&'static str>,
}

impl TrigramProvider {
    /// Create a new trigram provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        // Ordered so floating-point sums accumulate identically on every call
        let mut word_freq: BTreeMap<&str, u32> = BTreeMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !self.stop_words.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let freq = *freq as f32;
            let chars: Vec<char> = word.chars().collect();

            for trigram in chars.windows(3) {
                let bucket = self.bucket(trigram.iter().map(|c| *c as u64), 37);
                embedding[bucket] += freq.sqrt();
            }

            let bucket = self.bucket(word.bytes().map(u64::from), 31);
            embedding[bucket] += freq;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|v| *v /= norm);
        }

        embedding
    }

    fn bucket(&self, units: impl Iterator<Item = u64>, multiplier: u64) -> usize {
        let hash = units.fold(0u64, |acc, u| acc.wrapping_mul(multiplier).wrapping_add(u));
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    async fn embed(provider: &TrigramProvider, text: &str) -> Vec<f32> {
        provider
            .embed_batch(&[text.to_string()])
            .await
            .unwrap()
            .remove(0)
    }

    #[tokio::test]
    async fn test_trigram_provider_is_unit_length() {
        let provider = TrigramProvider::new(384);
        let embedding = embed(&provider, "hypertension and blood pressure").await;

        assert_eq!(embedding.len(), 384);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_trigram_provider_deterministic() {
        let provider = TrigramProvider::new(384);
        let text = "deterministic test";

        assert_eq!(embed(&provider, text).await, embed(&provider, text).await);
    }

    #[tokio::test]
    async fn test_repeated_words_embed_bit_identically() {
        let provider = TrigramProvider::new(7);
        let text = "fever fever fever cough cough headache headache headache headache \
                    nausea nausea fatigue fatigue fatigue fatigue fatigue fatigue \
                    dizziness dizziness rash rash rash chills chills";

        let first: Vec<u32> = embed(&provider, text).await.iter().map(|v| v.to_bits()).collect();
        for _ in 0..50 {
            let again: Vec<u32> =
                embed(&provider, text).await.iter().map(|v| v.to_bits()).collect();
            assert_eq!(first, again);
        }

        let fresh = TrigramProvider::new(7);
        let other: Vec<u32> = embed(&fresh, text).await.iter().map(|v| v.to_bits()).collect();
        assert_eq!(first, other);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let provider = TrigramProvider::new(384);

        let question = embed(&provider, "What are the symptoms of diabetes?").await;
        let related = embed(&provider, "Common diabetes symptoms include thirst and fatigue.").await;
        let unrelated = embed(&provider, "Fractures of the femur need orthopedic surgery.").await;

        assert!(cosine(&question, &related) > cosine(&question, &unrelated));
    }

    #[tokio::test]
    async fn test_trigram_provider_empty_text() {
        let provider = TrigramProvider::new(384);
        let embedding = embed(&provider, "").await;

        assert_eq!(embedding.len(), 384);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_trigram_provider_utf8_safety() {
        let provider = TrigramProvider::new(384);
        let embedding = embed(&provider, "Hipertensão arterial é comum 🩺 em idosos").await;

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }
}

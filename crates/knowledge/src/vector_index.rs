//! In-memory vector index over passages.
//!
//! An index is built once from a full set of passages and their vectors and
//! is read-only afterwards. Changing content means building a new index and
//! swapping the reference.

use crate::types::Passage;
use aidoc_core::config::DistanceMetric;
use aidoc_core::{AppError, AppResult};
use std::cmp::Ordering;
use uuid::Uuid;

#[derive(Debug)]
struct Entry {
    passage: Passage,
    vector: Vec<f32>,
}

/// Immutable nearest-neighbor index.
///
/// Entries are identified by insertion position, which also breaks ties
/// between equal distances.
#[derive(Debug)]
pub struct VectorIndex {
    id: Uuid,
    entries: Vec<Entry>,
    dimension: usize,
    metric: DistanceMetric,
}

impl VectorIndex {
    /// Build an index from passages and their vectors, paired by position.
    ///
    /// # Errors
    /// - `Config` if the two sequences differ in length
    /// - `EmptyInput` if there are no passages
    /// - `DimensionMismatch` if a vector's length differs from the first one's
    pub fn build(
        passages: Vec<Passage>,
        vectors: Vec<Vec<f32>>,
        metric: DistanceMetric,
    ) -> AppResult<Self> {
        if passages.len() != vectors.len() {
            return Err(AppError::Config(format!(
                "{} passages but {} vectors",
                passages.len(),
                vectors.len()
            )));
        }

        let dimension = match vectors.first() {
            Some(first) => first.len(),
            None => {
                return Err(AppError::EmptyInput(
                    "cannot build an index without passages".to_string(),
                ))
            }
        };

        if let Some((position, bad)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != dimension)
        {
            return Err(AppError::DimensionMismatch {
                expected: dimension,
                found: bad.len(),
                position,
            });
        }

        let entries = passages
            .into_iter()
            .zip(vectors)
            .map(|(passage, vector)| Entry { passage, vector })
            .collect();

        Ok(Self {
            id: Uuid::new_v4(),
            entries,
            dimension,
            metric,
        })
    }

    /// The `k` nearest passages, ascending by distance.
    ///
    /// Returns `min(k, len)` results.
    ///
    /// # Errors
    /// - `Config` if `k` is zero
    /// - `DimensionMismatch` if the query has the wrong dimension
    pub fn query(&self, vector: &[f32], k: usize) -> AppResult<Vec<(Passage, f32)>> {
        if k == 0 {
            return Err(AppError::Config("k must be at least 1".to_string()));
        }

        if vector.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                found: vector.len(),
                position: 0,
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(id, entry)| (id, distance(self.metric, vector, &entry.vector)))
            .collect();

        scored.sort_by(|a, b| match a.1.total_cmp(&b.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(k);

        if let (Some(first), Some(last)) = (scored.first(), scored.last()) {
            tracing::debug!(
                "Query over {} passages returned {} (distance {:.3}..{:.3})",
                self.entries.len(),
                scored.len(),
                first.1,
                last.1
            );
        }

        Ok(scored
            .into_iter()
            .map(|(id, dist)| (self.entries[id].passage.clone(), dist))
            .collect())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Passages in insertion order.
    pub fn passages(&self) -> impl Iterator<Item = &Passage> {
        self.entries.iter().map(|e| &e.passage)
    }
}

fn distance(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
    }
}

/// Cosine similarity; zero when either vector has zero length.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

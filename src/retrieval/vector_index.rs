//! Flat L2 vector index
//!
//! Exact nearest-neighbour search over the embedded rule chunks. The vector
//! at position `i` always corresponds to chunk-list position `i`; that
//! correspondence is what makes a search result map back to the right rule
//! text, so the persisted form stamps the embedding model id and dimension
//! and both are verified when the index is loaded.

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Exact L2 nearest-neighbour index over chunk embeddings
pub struct VectorIndex {
    embeddings: Vec<Vec<f32>>,
    dim: usize,
    model_id: String,
}

/// On-disk form of the index
#[derive(Serialize, Deserialize)]
struct PersistedVectorIndex {
    version: u32,
    model_id: String,
    dim: usize,
    embeddings: Vec<Vec<f32>>,
}

impl PersistedVectorIndex {
    /// Current persistence format version (bump this when format changes)
    const CURRENT_VERSION: u32 = 1;
}

impl VectorIndex {
    pub fn new(model_id: impl Into<String>, dim: usize) -> Self {
        Self {
            embeddings: Vec::new(),
            dim,
            model_id: model_id.into(),
        }
    }

    /// Append an embedding at the next position
    pub fn add(&mut self, embedding: Vec<f32>) -> Result<()> {
        if embedding.len() != self.dim {
            anyhow::bail!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dim,
                embedding.len()
            );
        }

        self.embeddings.push(embedding);
        Ok(())
    }

    /// Search for the k nearest neighbours by squared L2 distance.
    ///
    /// Returns `min(k, len)` results as (position, distance) pairs in
    /// ascending-distance order. No threshold is applied: the nearest
    /// vectors are returned even when very dissimilar. A query with the
    /// wrong dimension is an error, same as in [`Self::add`].
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dim {
            anyhow::bail!(
                "Query dimension mismatch: expected {}, got {}",
                self.dim,
                query.len()
            );
        }

        let mut results: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(position, emb)| (position, l2_distance(query, emb)))
            .collect();

        results.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);

        Ok(results)
    }

    /// Number of indexed vectors
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Save the index to a file with an exclusive lock
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create index directory: {}", parent.display())
            })?;
        }

        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create index file: {}", path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to acquire exclusive lock on: {}", path.display()))?;

        let persisted = PersistedVectorIndex {
            version: PersistedVectorIndex::CURRENT_VERSION,
            model_id: self.model_id.clone(),
            dim: self.dim,
            embeddings: self.embeddings.clone(),
        };

        let writer = std::io::BufWriter::new(&file);
        bincode::serialize_into(writer, &persisted)
            .with_context(|| format!("Failed to serialize index: {}", path.display()))?;

        // Lock is released when the file handle drops
        Ok(())
    }

    /// Load an index from a file with a shared lock
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open index file: {}", path.display()))?;
        file.lock_shared()
            .with_context(|| format!("Failed to acquire shared lock on: {}", path.display()))?;

        let reader = std::io::BufReader::new(&file);
        let persisted: PersistedVectorIndex = bincode::deserialize_from(reader)
            .with_context(|| format!("Failed to deserialize index: {}", path.display()))?;

        if persisted.version != PersistedVectorIndex::CURRENT_VERSION {
            anyhow::bail!(
                "Index format version mismatch: found {}, expected {}. Rebuild the index.",
                persisted.version,
                PersistedVectorIndex::CURRENT_VERSION
            );
        }

        Ok(Self {
            embeddings: persisted.embeddings,
            dim: persisted.dim,
            model_id: persisted.model_id,
        })
    }
}

/// Squared Euclidean distance (monotonic in L2, so ranking is identical)
fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_search() {
        let mut index = VectorIndex::new("test-model", 3);

        index.add(vec![1.0, 0.0, 0.0]).unwrap();
        index.add(vec![0.0, 1.0, 0.0]).unwrap();
        index.add(vec![0.0, 0.0, 1.0]).unwrap();

        assert_eq!(index.len(), 3);

        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0);
        assert!(results[0].1 < 0.001);
    }

    #[test]
    fn test_results_in_ascending_distance_order() {
        let mut index = VectorIndex::new("test-model", 2);
        index.add(vec![0.0, 3.0]).unwrap();
        index.add(vec![0.0, 1.0]).unwrap();
        index.add(vec![0.0, 2.0]).unwrap();

        let results = index.search(&[0.0, 0.0], 3).unwrap();
        let distances: Vec<f32> = results.iter().map(|r| r.1).collect();
        assert_eq!(results.iter().map(|r| r.0).collect::<Vec<_>>(), vec![1, 2, 0]);
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_k_larger_than_index_returns_all() {
        let mut index = VectorIndex::new("test-model", 2);
        index.add(vec![1.0, 0.0]).unwrap();
        index.add(vec![0.0, 1.0]).unwrap();

        let results = index.search(&[1.0, 0.0], 10).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut index = VectorIndex::new("test-model", 3);
        assert!(index.add(vec![1.0, 0.0]).is_err());
    }

    #[test]
    fn test_query_dimension_mismatch_is_an_error() {
        let mut index = VectorIndex::new("test-model", 3);
        index.add(vec![1.0, 0.0, 0.0]).unwrap();
        assert!(index.search(&[1.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_save_load_round_trip_preserves_stamp_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.index");

        let mut index = VectorIndex::new("term-hash-v1-2", 2);
        index.add(vec![1.0, 0.0]).unwrap();
        index.add(vec![0.0, 1.0]).unwrap();
        index.save(&path).unwrap();

        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dim(), 2);
        assert_eq!(loaded.model_id(), "term-hash-v1-2");

        let results = loaded.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(results[0].0, 0);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(VectorIndex::load(&dir.path().join("absent.index")).is_err());
    }
}

//! Retrieval engine
//!
//! Loads the persisted index and chunk list once at startup and resolves
//! queries into their nearest chunks. After a successful load the engine is
//! immutable: queries are pure reads over shared state, so it is handed to
//! request handlers as a plain `Arc` with no locking. A corpus change means
//! rebuilding the artifacts and restarting the service.

use super::builder::{load_chunks, ArtifactPaths};
use super::{EmbeddingModel, VectorIndex};
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Loaded, ready-to-query retrieval state
pub struct RetrievalEngine {
    index: VectorIndex,
    chunks: Vec<String>,
    model: EmbeddingModel,
}

/// A retrieved chunk with its distance to the query
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub text: String,
    pub distance: f32,
}

/// Caller-supplied input the engine refuses to search with.
///
/// Kept as a distinct type so the transport layer can tell bad input
/// apart from internal failures when mapping to a status code.
#[derive(Debug)]
pub struct InvalidInput(pub String);

impl std::fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid input: {}", self.0)
    }
}

impl std::error::Error for InvalidInput {}

/// Engine statistics
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub num_chunks: usize,
    pub embedding_dim: usize,
    pub model_id: String,
}

impl RetrievalEngine {
    /// Assemble an engine from already-loaded parts, verifying the
    /// index/chunk correspondence and the embedding stamp.
    pub fn new(index: VectorIndex, chunks: Vec<String>, model: EmbeddingModel) -> Result<Self> {
        if index.len() != chunks.len() {
            anyhow::bail!(
                "Index/chunk-list length mismatch: {} vectors but {} chunks. \
                 The artifacts are not a matched pair; rebuild the index.",
                index.len(),
                chunks.len()
            );
        }

        if index.model_id() != model.model_id() || index.dim() != model.dim() {
            anyhow::bail!(
                "Embedding model mismatch: index was built with {} (dim {}), \
                 query-time model is {} (dim {}). Rebuild the index.",
                index.model_id(),
                index.dim(),
                model.model_id(),
                model.dim()
            );
        }

        Ok(Self {
            index,
            chunks,
            model,
        })
    }

    /// Load the persisted artifact pair. Any missing or inconsistent
    /// artifact is an error; the service must not start on partial state.
    pub fn load(paths: &ArtifactPaths, model: EmbeddingModel) -> Result<Self> {
        let index = VectorIndex::load(&paths.index)
            .with_context(|| format!("Failed to load index from {}", paths.index.display()))?;
        let chunks = load_chunks(&paths.chunks)
            .with_context(|| format!("Failed to load chunk list from {}", paths.chunks.display()))?;

        let engine = Self::new(index, chunks, model)?;

        info!(
            chunks = engine.chunks.len(),
            dim = engine.model.dim(),
            model = %engine.model.model_id(),
            "Retrieval engine ready"
        );

        Ok(engine)
    }

    /// Retrieve the `top_k` chunks nearest to `question`.
    ///
    /// Returns `min(top_k, indexed chunks)` results in ascending-distance
    /// order. No deduplication and no relevance threshold: even a
    /// nonsensical question gets its nearest chunks back.
    pub fn search(&self, question: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        if question.trim().is_empty() {
            return Err(InvalidInput("question must not be empty".to_string()).into());
        }
        if top_k == 0 {
            return Err(InvalidInput("top_k must be at least 1".to_string()).into());
        }

        let query = self.model.embed_one(question);
        let neighbors = self.index.search(&query, top_k)?;

        let results: Vec<ScoredChunk> = neighbors
            .into_iter()
            .map(|(position, distance)| ScoredChunk {
                text: self.chunks[position].clone(),
                distance,
            })
            .collect();

        debug!(top_k, results = results.len(), "Search completed");

        Ok(results)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            num_chunks: self.chunks.len(),
            embedding_dim: self.model.dim(),
            model_id: self.model.model_id(),
        }
    }
}

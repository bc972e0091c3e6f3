//! Offline index construction
//!
//! Embeds every chunk in one batch, builds the flat index in chunk order and
//! persists the index and the chunk list together. The two artifacts are a
//! matched pair: both live under one directory and neither is meaningful
//! without the other. Rebuilds always overwrite; there is no incremental
//! update or migration path.

use super::{EmbeddingModel, VectorIndex};
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const CHUNKS_FORMAT_VERSION: u32 = 1;

/// Locations of the persisted index and chunk list
///
/// Always derived from a single directory so the pair travels together.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub index: PathBuf,
    pub chunks: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            index: dir.join("rules.index"),
            chunks: dir.join("rules.chunks"),
        }
    }
}

/// On-disk form of the chunk list
#[derive(Serialize, Deserialize)]
struct PersistedChunks {
    version: u32,
    chunks: Vec<String>,
}

/// Build the vector index over `chunks` and persist both artifacts.
///
/// Index position `i` is derived from `chunks[i]`; the batch embedding and
/// insertion loop below are the only places that ordering is established.
pub fn build_index(chunks: &[String], model: &EmbeddingModel, paths: &ArtifactPaths) -> Result<()> {
    info!(
        chunks = chunks.len(),
        model = %model.model_id(),
        "Embedding chunks"
    );
    let embeddings = model.embed(chunks);

    let mut index = VectorIndex::new(model.model_id(), model.dim());
    for embedding in embeddings {
        index.add(embedding)?;
    }

    index
        .save(&paths.index)
        .with_context(|| format!("Failed to persist index: {}", paths.index.display()))?;
    save_chunks(chunks, &paths.chunks)
        .with_context(|| format!("Failed to persist chunk list: {}", paths.chunks.display()))?;

    info!(
        index_path = %paths.index.display(),
        chunks_path = %paths.chunks.display(),
        vectors = index.len(),
        "Index built and persisted"
    );

    Ok(())
}

/// Save the chunk list with an exclusive lock
pub fn save_chunks(chunks: &[String], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create chunks directory: {}", parent.display()))?;
    }

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create chunks file: {}", path.display()))?;
    file.lock_exclusive()
        .with_context(|| format!("Failed to acquire exclusive lock on: {}", path.display()))?;

    let persisted = PersistedChunks {
        version: CHUNKS_FORMAT_VERSION,
        chunks: chunks.to_vec(),
    };

    let writer = std::io::BufWriter::new(&file);
    bincode::serialize_into(writer, &persisted)
        .with_context(|| format!("Failed to serialize chunk list: {}", path.display()))?;

    Ok(())
}

/// Load the chunk list with a shared lock
pub fn load_chunks(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open chunks file: {}", path.display()))?;
    file.lock_shared()
        .with_context(|| format!("Failed to acquire shared lock on: {}", path.display()))?;

    let reader = std::io::BufReader::new(&file);
    let persisted: PersistedChunks = bincode::deserialize_from(reader)
        .with_context(|| format!("Failed to deserialize chunk list: {}", path.display()))?;

    if persisted.version != CHUNKS_FORMAT_VERSION {
        anyhow::bail!(
            "Chunk list format version mismatch: found {}, expected {}. Rebuild the index.",
            persisted.version,
            CHUNKS_FORMAT_VERSION
        );
    }

    Ok(persisted.chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_persists_matched_pair() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let model = EmbeddingModel::new(64);

        let chunks = vec![
            "draw a card".to_string(),
            "deal damage".to_string(),
            "gain life".to_string(),
        ];
        build_index(&chunks, &model, &paths).unwrap();

        let index = VectorIndex::load(&paths.index).unwrap();
        let loaded_chunks = load_chunks(&paths.chunks).unwrap();

        assert_eq!(index.len(), loaded_chunks.len());
        assert_eq!(loaded_chunks, chunks);
        assert_eq!(index.model_id(), model.model_id());
        assert_eq!(index.dim(), model.dim());
    }

    #[test]
    fn test_rebuild_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let model = EmbeddingModel::new(32);

        build_index(&["one".to_string(), "two".to_string()], &model, &paths).unwrap();
        build_index(&["only".to_string()], &model, &paths).unwrap();

        assert_eq!(VectorIndex::load(&paths.index).unwrap().len(), 1);
        assert_eq!(load_chunks(&paths.chunks).unwrap(), vec!["only"]);
    }

    #[test]
    fn test_index_position_matches_chunk_position() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let model = EmbeddingModel::new(64);

        let chunks = vec![
            "creatures attack during combat".to_string(),
            "instants resolve before sorceries on the stack".to_string(),
            "players draw during the draw step".to_string(),
        ];
        build_index(&chunks, &model, &paths).unwrap();

        let index = VectorIndex::load(&paths.index).unwrap();
        for (position, chunk) in chunks.iter().enumerate() {
            let results = index.search(&model.embed_one(chunk), 1).unwrap();
            assert_eq!(results[0].0, position);
            assert!(results[0].1 < 0.001);
        }
    }
}

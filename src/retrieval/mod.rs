//! Retrieval core
//!
//! Chunks the rules corpus, embeds the chunks, builds the persisted flat L2
//! index and answers top-k nearest-chunk queries against it.

pub mod builder;
pub mod chunking;
pub mod embeddings;
pub mod engine;
pub mod vector_index;

pub use builder::{build_index, load_chunks, save_chunks, ArtifactPaths};
pub use chunking::RuleChunker;
pub use embeddings::{EmbeddingModel, DEFAULT_EMBEDDING_DIM};
pub use engine::{EngineStats, InvalidInput, RetrievalEngine, ScoredChunk};
pub use vector_index::VectorIndex;

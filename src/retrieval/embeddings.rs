//! Sentence embeddings for rules text
//!
//! Deterministic hashed bag-of-terms embedding with L2-normalised output.
//! The model has no learned state, so the same text and dimension always
//! produce the same vector in any process. The model identifier stamps the
//! persisted index so a mismatched embedder is caught at load time instead
//! of silently skewing every distance comparison.

use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Deterministic sentence-embedding model
///
/// Constructed once at startup and shared read-only across queries;
/// encoding never mutates the model.
pub struct EmbeddingModel {
    dim: usize,
}

impl EmbeddingModel {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Embedding dimension, constant for the model's lifetime
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Stable identifier for this model configuration
    pub fn model_id(&self) -> String {
        format!("term-hash-v1-{}", self.dim)
    }

    /// Encode a single text (used for queries)
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dim];

        for term in tokenize(text) {
            let mut hasher = FxHasher::default();
            term.hash(&mut hasher);
            let idx = (hasher.finish() as usize) % self.dim;
            embedding[idx] += 1.0;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut embedding {
                *val /= norm;
            }
        }

        embedding
    }

    /// Encode a batch of texts in input order
    pub fn embed(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|text| self.embed_one(text)).collect()
    }
}

impl Default for EmbeddingModel {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

/// Lowercased alphanumeric terms, dropping one- and two-character noise
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.len() > 2)
        .map(|s| stem(s).to_string())
        .collect()
}

/// Strip a common English inflection so "drawing"/"draws" and "draw" land
/// in the same bucket. Crude on purpose; only the first matching suffix is
/// removed and short stems are left alone.
fn stem(term: &str) -> &str {
    for suffix in ["ing", "ed", "es", "s"] {
        if let Some(stripped) = term.strip_suffix(suffix) {
            if stripped.len() > 2 {
                return stripped;
            }
        }
    }
    term
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_has_fixed_dim_and_unit_norm() {
        let model = EmbeddingModel::default();
        let embedding = model.embed_one("a creature with flying blocks");
        assert_eq!(embedding.len(), DEFAULT_EMBEDDING_DIM);

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_embed_is_deterministic() {
        let model = EmbeddingModel::new(128);
        let a = model.embed_one("untap step of each turn");
        let b = model.embed_one("untap step of each turn");
        assert_eq!(a, b);
    }

    #[test]
    fn test_related_texts_are_closer() {
        let model = EmbeddingModel::default();
        let draw = model.embed_one("draw a card from your library");
        let drawing = model.embed_one("drawing cards from the library");
        let damage = model.embed_one("deal combat damage to the defending player");

        assert!(l2(&draw, &drawing) < l2(&draw, &damage));
    }

    #[test]
    fn test_inflections_share_buckets() {
        let model = EmbeddingModel::default();
        let a = model.embed_one("draw a card");
        let b = model.embed_one("drawing cards");
        // Stemming maps both phrases onto the same two terms.
        assert!(l2(&a, &b) < 0.001);
    }

    #[test]
    fn test_batch_preserves_order() {
        let model = EmbeddingModel::default();
        let texts = vec!["first rule".to_string(), "second rule".to_string()];
        let batch = model.embed(&texts);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], model.embed_one("first rule"));
        assert_eq!(batch[1], model.embed_one("second rule"));
    }

    fn l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }
}

//! The embedding seam and a deterministic offline implementation.
//!
//! Long-term memory stores an embedding vector per record for similarity
//! search. How embeddings are produced is a substrate concern hidden
//! behind [`Embedder`], so tests and offline runs stay deterministic
//! while deployments can plug a remote model behind the same trait.
//!
//! [`HashingEmbedder`] is the offline implementation: token feature
//! hashing into a fixed number of buckets, L2-normalized. It captures
//! lexical overlap (shared words land in shared buckets), which is all
//! the relevance ranking needs from it.

use std::hash::{Hash, Hasher};

/// Produces a fixed-dimension embedding for a text.
pub trait Embedder {
    /// Embed a text into a vector. Implementations must be
    /// deterministic: equal texts yield equal vectors.
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Deterministic bag-of-words feature-hashing embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    /// Default embedding dimensionality.
    pub const DEFAULT_DIMS: usize = 128;

    /// Create an embedder with the given number of hash buckets.
    pub const fn new(dims: usize) -> Self {
        Self { dims: if dims == 0 { 1 } else { dims } }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMS)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dims];

        let dims = u64::try_from(self.dims).unwrap_or(1).max(1);
        for token in tokenize(text) {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = usize::try_from(hasher.finish() % dims).unwrap_or(0);
            if let Some(slot) = vector.get_mut(bucket) {
                *slot += 1.0;
            }
        }

        l2_normalize(&mut vector);
        vector
    }
}

/// Lowercased alphanumeric tokens of a text.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Scale a vector to unit length in place (no-op for the zero vector).
fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Cosine similarity of two vectors.
///
/// Returns 0 for mismatched lengths or zero vectors, so degenerate
/// inputs rank as "unrelated" rather than erroring.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_deterministic() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("apples near the east wall");
        let b = embedder.embed("apples near the east wall");
        assert_eq!(a, b);
    }

    #[test]
    fn embedding_is_unit_length() {
        let embedder = HashingEmbedder::default();
        let v = embedder.embed("gather apples by the river");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let embedder = HashingEmbedder::default();
        let v = embedder.embed("");
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn shared_words_increase_similarity() {
        let embedder = HashingEmbedder::default();
        let apples_a = embedder.embed("apples growing in the orchard");
        let apples_b = embedder.embed("apples ripening in the orchard");
        let walls = embedder.embed("a long stone wall to the north");

        let close = cosine_similarity(&apples_a, &apples_b);
        let far = cosine_similarity(&apples_a, &walls);
        assert!(close > far);
    }

    #[test]
    fn identical_texts_have_similarity_one() {
        let embedder = HashingEmbedder::default();
        let v = embedder.embed("the same text");
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn tokenizer_splits_on_punctuation() {
        assert_eq!(
            tokenize("Apple, at (3, 4)!"),
            vec!["apple", "at", "3", "4"]
        );
    }
}

//! Similarity provider boundary: text embeddings and their comparison.
//!
//! The engine never inspects vector contents; it stores whatever the provider
//! returns and feeds it back symmetrically at sync time.

use futures::future::BoxFuture;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Dimensionality of the deterministic fallback embedding.
const FALLBACK_DIM: usize = 384;

/// Errors surfaced by the similarity provider.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The embedding backend could not produce a vector.
    #[error("embedding backend unavailable: {0}")]
    Unavailable(String),
}

/// Abstraction over text-to-vector embedding and vector comparison.
pub trait SimilarityProvider: Send + Sync {
    /// Embed normalized text into a vector. May be slow or fail; callers must
    /// not hold a room's exclusive section across this call.
    fn embed(&self, text: &str) -> BoxFuture<'static, Result<Vec<f32>, EmbeddingError>>;

    /// Symmetric similarity of two vectors in [0,1]; 0.0 when either input is
    /// empty or zero-norm.
    fn similarity(&self, a: &[f32], b: &[f32]) -> f64 {
        cosine_similarity(a, b)
    }
}

/// Cosine similarity clamped to [0,1], with 0.0 for empty or zero-norm input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (dot / denom).clamp(0.0, 1.0)
}

/// Deterministic hash-based embedder.
///
/// Stands in for a sentence-embedding model so the server runs without a
/// model download: the SHA-256 digest of the text is cycled out to
/// [`FALLBACK_DIM`] dimensions and L2-normalized. Identical texts embed
/// identically across processes and restarts.
#[derive(Debug, Default, Clone)]
pub struct HashEmbedder;

impl SimilarityProvider for HashEmbedder {
    fn embed(&self, text: &str) -> BoxFuture<'static, Result<Vec<f32>, EmbeddingError>> {
        let vector = hash_embedding(text);
        Box::pin(async move { Ok(vector) })
    }
}

fn hash_embedding(text: &str) -> Vec<f32> {
    let digest = Sha256::digest(text.as_bytes());
    let mut values: Vec<f32> = digest
        .iter()
        .cycle()
        .take(FALLBACK_DIM)
        .map(|byte| f32::from(*byte))
        .collect();

    let norm = values
        .iter()
        .map(|v| f64::from(*v) * f64::from(*v))
        .sum::<f64>()
        .sqrt();
    if norm > 0.0 {
        for value in &mut values {
            *value = (f64::from(*value) / norm) as f32;
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embeddings_are_deterministic_and_normalized() {
        let provider = HashEmbedder;
        let first = provider.embed("late night vibes").await.unwrap();
        let second = provider.embed("late night vibes").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), FALLBACK_DIM);

        let norm: f64 = first.iter().map(|v| f64::from(*v) * f64::from(*v)).sum();
        assert!((norm.sqrt() - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn identical_texts_have_full_similarity() {
        let provider = HashEmbedder;
        let a = provider.embed("pizza at 3am").await.unwrap();
        let b = provider.embed("pizza at 3am").await.unwrap();
        assert!((provider.similarity(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn different_texts_stay_in_unit_range() {
        let provider = HashEmbedder;
        let a = provider.embed("pizza at 3am").await.unwrap();
        let b = provider.embed("quiet morning walks").await.unwrap();
        let similarity = provider.similarity(&a, &b);
        assert!((0.0..=1.0).contains(&similarity));
    }

    #[test]
    fn zero_norm_input_has_zero_similarity() {
        assert_eq!(cosine_similarity(&[], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = hash_embedding("alpha");
        let b = hash_embedding("beta");
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }
}

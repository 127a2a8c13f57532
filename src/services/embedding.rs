//! `Embedding`: the optional capability the boundary detector and the
//! semantic-link graph builder use for cosine similarity. Cosine similarity
//! itself is generalized from `the_agency::memory::SqliteMemoryStore
//! ::cosine_similarity`.

use crate::cancel::Ctx;
use crate::error::Result;
use async_trait::async_trait;

/// Purpose tag for an embedding request — lets a real backend pick a
/// task-specific model the way `the_agency`'s providers pick per-task models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingPurpose {
    BoundaryDetection,
    SemanticLink,
    General,
}

#[async_trait]
pub trait Embedding: Send + Sync {
    async fn generate_one(&self, text: &str, purpose: EmbeddingPurpose, ctx: &Ctx) -> Result<Vec<f32>>;

    async fn generate_batch(
        &self,
        texts: &[String],
        purpose: EmbeddingPurpose,
        ctx: &Ctx,
    ) -> Result<Vec<Vec<f32>>>;

    fn embedding_dimension(&self) -> usize;

    fn max_tokens(&self) -> usize;

    fn supports_batch(&self) -> bool;
}

/// Cosine similarity between two equal-length vectors. Returns 0.0 for
/// mismatched lengths or zero vectors rather than panicking or NaN-ing.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// A deterministic stand-in for tests: hashes text into a low-dimensional
/// bag-of-words vector so that similar inputs produce similar embeddings
/// without pulling in a real model.
pub struct MockEmbedding {
    pub dimension: usize,
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self { dimension: 32 }
    }
}

impl MockEmbedding {
    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in text.split_whitespace() {
            let mut hash: u64 = 1469598103934665603;
            for byte in word.as_bytes() {
                hash ^= *byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let idx = (hash as usize) % self.dimension;
            vector[idx] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedding for MockEmbedding {
    async fn generate_one(&self, text: &str, _purpose: EmbeddingPurpose, _ctx: &Ctx) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn generate_batch(
        &self,
        texts: &[String],
        _purpose: EmbeddingPurpose,
        _ctx: &Ctx,
    ) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn max_tokens(&self) -> usize {
        8192
    }

    fn supports_batch(&self) -> bool {
        true
    }
}

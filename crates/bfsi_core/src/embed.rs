use crate::config::DEFAULT_EMBEDDING_DIM;
use crate::error::Result;

/// Maps text to a fixed-length dense vector. Implementations hold no mutable
/// state, so a provider can be shared freely across query-handling threads.
pub trait EmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

impl EmbeddingProvider for Box<dyn EmbeddingProvider + Send + Sync> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }
}

/// Deterministic signed token-hash embedding. No model weights required,
/// which makes it the backend for tests and for environments without the
/// sentence-transformer checkpoint. Identical texts always map to identical
/// vectors, so similarity thresholds behave reproducibly.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dim: usize,
}

impl HashEmbeddingProvider {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

fn fnv1a(token: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in token.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dim];

        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(token);
            let bucket = ((hash >> 1) as usize) % self.dim;
            // Low bit picks the sign so colliding tokens tend to cancel
            // instead of stacking up.
            if hash & 1 == 0 {
                vector[bucket] += 1.0;
            } else {
                vector[bucket] -= 1.0;
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }

        Ok(vector)
    }
}

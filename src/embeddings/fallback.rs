//! Deterministic pseudo-embeddings.
//!
//! These vectors carry no meaning beyond the exact text they were made
//! from. They keep the pipeline running when the embedding service is down:
//! identical text always yields the identical vector.

use super::{Embedding, EmbeddingBackend, EmbeddingMethod};
use crate::error::Result;
use async_trait::async_trait;

/// Generate the fallback vector for `text`
///
/// For each dimension `i` a rolling hash seeded with `i` runs over the
/// characters of the text; the component is `sin(hash) * 0.5`.
pub fn fallback_embedding(text: &str, dimension: usize) -> Embedding {
    let chars: Vec<char> = text.chars().collect();
    (0..dimension)
        .map(|i| {
            let mut hash = i as i32;
            for &c in &chars {
                hash = hash
                    .wrapping_shl(5)
                    .wrapping_sub(hash)
                    .wrapping_add(c as i32);
            }
            ((hash as f64).sin() * 0.5) as f32
        })
        .collect()
}

/// Backend that only ever produces fallback vectors
#[derive(Debug, Clone)]
pub struct FallbackBackend {
    dimension: usize,
}

impl FallbackBackend {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingBackend for FallbackBackend {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(fallback_embedding(text, self.dimension))
    }

    fn method(&self) -> EmbeddingMethod {
        EmbeddingMethod::Fallback
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

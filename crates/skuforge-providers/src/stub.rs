//! Deterministic local embedding provider.
//!
//! Derives vectors from content hashes of the inputs, so offline runs and
//! tests get stable, repeatable embeddings with no network and no token.
//! The vectors carry no semantic meaning.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use skuforge_core::{Error, Result};

use crate::embedding::{EmbeddingPair, EmbeddingProvider, GenerationParams};

/// Embedding provider seeded by SHA-256 of the inputs.
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    /// Create a stub producing vectors of the given length.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector_for(&self, seed: &str) -> Vec<f32> {
        let mut values = Vec::with_capacity(self.dimension);
        let mut block: u32 = 0;
        while values.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(seed.as_bytes());
            hasher.update(block.to_be_bytes());
            let digest = hasher.finalize();
            for byte in digest {
                if values.len() == self.dimension {
                    break;
                }
                // Map bytes onto [-1, 1].
                values.push(f32::from(byte) / 127.5 - 1.0);
            }
            block += 1;
        }
        values
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, image_url: &str, contextual_text: &str) -> Result<EmbeddingPair> {
        if image_url.is_empty() {
            return Err(Error::provider("image url is empty"));
        }
        if contextual_text.is_empty() {
            return Err(Error::provider("contextual text is empty"));
        }
        Ok(EmbeddingPair {
            image: self.vector_for(image_url),
            text: self.vector_for(contextual_text),
        })
    }

    async fn generate_text(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        if prompt.is_empty() {
            return Err(Error::provider("prompt is empty"));
        }
        let digest = Sha256::digest(prompt.as_bytes());
        let tag = hex::encode(&digest[..4]);
        // Deterministic stand-in copy; length respects the token budget in
        // spirit only.
        let _ = params;
        Ok(format!(
            "A quality product that delivers on its promise. [stub copy {tag}]"
        ))
    }
}

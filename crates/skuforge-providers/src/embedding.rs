//! The embedding/generation provider abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skuforge_core::Result;

/// The two vectors produced for one (image, text) input.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingPair {
    pub image: Vec<f32>,
    pub text: Vec<f32>,
}

/// Knobs forwarded to the text-generation model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_output_tokens: 1024,
            temperature: 0.5,
        }
    }
}

/// A provider of multimodal embeddings and text generation.
///
/// Implementations must be safe to share across worker tasks; the pipeline
/// holds one instance behind an `Arc` for the whole run.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Length of the vectors [`EmbeddingProvider::embed`] returns.
    fn dimension(&self) -> usize;

    /// Produce the image and text embedding pair for one record.
    ///
    /// `image_url` points at the re-hosted asset; `contextual_text` is the
    /// record's name/description/brand text.
    async fn embed(&self, image_url: &str, contextual_text: &str) -> Result<EmbeddingPair>;

    /// Generate free text from a prompt.
    async fn generate_text(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
}

//! Embedding computation over the re-hosted image and contextual text.

use std::sync::Arc;

use async_trait::async_trait;
use skuforge_core::{Error, Product, Result};
use skuforge_providers::EmbeddingProvider;
use tracing::debug;

use crate::outcome::{FailureRecord, Outcome, Snapshot};
use crate::stage::Stage;

/// Populates both embedding vectors from the provider.
///
/// A record must arrive with a hosted image URL; one without has bypassed
/// the fetch stage, which is a contract violation and aborts the run.
/// Provider errors and empty contextual text are ordinary failures.
pub struct EmbedStage {
    provider: Arc<dyn EmbeddingProvider>,
}

impl EmbedStage {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Stage for EmbedStage {
    type Input = Product;
    type Output = Product;

    fn name(&self) -> &'static str {
        "embed"
    }

    async fn process(&self, mut product: Product) -> Result<Outcome<Product>> {
        let hosted_url = product
            .primary_image()
            .and_then(|image| image.hosted_url.clone())
            .ok_or_else(|| {
                Error::contract(
                    self.name(),
                    format!("record '{}' has no hosted image", product.sku),
                )
            })?;

        let snapshot = product.snapshot();
        let text = product.contextual_text();
        if text.trim().is_empty() {
            return Ok(Outcome::Failure(FailureRecord::new(
                self.name(),
                snapshot,
                "empty contextual text",
            )));
        }

        match self.provider.embed(&hosted_url, &text).await {
            Ok(pair) => {
                debug!(
                    sku = %product.sku,
                    provider = self.provider.name(),
                    dimension = pair.image.len(),
                    "embeddings computed"
                );
                product.image_embedding = Some(pair.image);
                product.text_embedding = Some(pair.text);
                Ok(Outcome::Success(product))
            }
            Err(e) => Ok(Outcome::Failure(FailureRecord::new(
                self.name(),
                snapshot,
                format!("embedding failed: {e}"),
            ))),
        }
    }
}

//! Marketing-copy generation for records missing a description.

use std::sync::Arc;

use async_trait::async_trait;
use skuforge_core::{Product, Result};
use skuforge_providers::{EmbeddingProvider, GenerationParams};
use tracing::debug;

use crate::outcome::{FailureRecord, Outcome, Snapshot};
use crate::stage::Stage;

/// Fills an empty description with generated marketing copy.
///
/// Records that already carry a description pass through without a
/// provider call. This stage is optional; the pipeline only includes it
/// when copy generation is enabled in the configuration.
pub struct DescribeStage {
    provider: Arc<dyn EmbeddingProvider>,
    params: GenerationParams,
}

impl DescribeStage {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, params: GenerationParams) -> Self {
        Self { provider, params }
    }

    fn prompt(product: &Product) -> String {
        let attributes = product
            .attributes
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Generate a compelling and accurate product description for a \
             product with the following description and attributes. \
             Description: {} Attributes: {}",
            product.header.name, attributes
        )
    }
}

#[async_trait]
impl Stage for DescribeStage {
    type Input = Product;
    type Output = Product;

    fn name(&self) -> &'static str {
        "describe"
    }

    async fn process(&self, mut product: Product) -> Result<Outcome<Product>> {
        if !product.header.description.trim().is_empty() {
            return Ok(Outcome::Success(product));
        }

        let snapshot = product.snapshot();
        let copy = match self
            .provider
            .generate_text(&Self::prompt(&product), &self.params)
            .await
        {
            Ok(copy) => copy,
            Err(e) => {
                return Ok(Outcome::Failure(FailureRecord::new(
                    self.name(),
                    snapshot,
                    format!("copy generation failed: {e}"),
                )))
            }
        };

        let copy = copy.trim();
        if copy.is_empty() {
            return Ok(Outcome::Failure(FailureRecord::new(
                self.name(),
                snapshot,
                "provider returned empty copy",
            )));
        }

        debug!(sku = %product.sku, chars = copy.len(), "description generated");
        product.header.description = copy.to_string();
        Ok(Outcome::Success(product))
    }
}

//! Warehouse persistence.

use std::sync::Arc;

use async_trait::async_trait;
use skuforge_core::{Error, Product, Result};
use skuforge_providers::{ProductRow, Warehouse};
use tracing::debug;

use crate::outcome::{FailureRecord, Outcome, Snapshot};
use crate::stage::Stage;

/// Writes the enriched record to the warehouse.
///
/// A record must arrive with both embedding vectors; one without has
/// bypassed the embed stage and aborts the run. Warehouse rejections
/// (per-row or sink-level) are ordinary failures.
pub struct PersistStage {
    warehouse: Arc<dyn Warehouse>,
}

impl PersistStage {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }
}

#[async_trait]
impl Stage for PersistStage {
    type Input = Product;
    type Output = Product;

    fn name(&self) -> &'static str {
        "persist"
    }

    async fn process(&self, product: Product) -> Result<Outcome<Product>> {
        if !product.has_embeddings() {
            return Err(Error::contract(
                self.name(),
                format!("record '{}' has no embeddings", product.sku),
            ));
        }

        let snapshot = product.snapshot();
        let row = ProductRow::from_product(&product)?;

        let row_errors = match self.warehouse.insert_rows(&[row]).await {
            Ok(errors) => errors,
            Err(e) => {
                return Ok(Outcome::Failure(FailureRecord::new(
                    self.name(),
                    snapshot,
                    format!("warehouse insert failed: {e}"),
                )))
            }
        };

        if let Some(rejected) = row_errors.first() {
            return Ok(Outcome::Failure(FailureRecord::new(
                self.name(),
                snapshot,
                format!("row rejected: {}", rejected.reason),
            )));
        }

        debug!(sku = %product.sku, warehouse = self.warehouse.name(), "row persisted");
        Ok(Outcome::Success(product))
    }
}

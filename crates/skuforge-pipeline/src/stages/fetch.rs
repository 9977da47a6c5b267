//! Primary-image retrieval and re-hosting.

use std::sync::Arc;

use async_trait::async_trait;
use skuforge_core::{Product, Result};
use skuforge_providers::ObjectStore;
use tracing::debug;

use crate::outcome::{FailureRecord, Outcome, Snapshot};
use crate::stage::Stage;

/// Key assigned to a product's re-hosted primary image.
fn asset_key(sku: &str) -> String {
    format!("images/{sku}.jpg")
}

/// Downloads the record's primary image and re-hosts it in the object
/// store, rewriting `hosted_url` to the new location.
///
/// A record with no images, an unreachable origin, or a non-2xx origin
/// response joins the failure branch; the reason for a bad response keeps
/// the status code.
pub struct FetchStage {
    http: reqwest::Client,
    store: Arc<dyn ObjectStore>,
}

impl FetchStage {
    pub fn new(http: reqwest::Client, store: Arc<dyn ObjectStore>) -> Self {
        Self { http, store }
    }

    async fn fetch(&self, product: &mut Product) -> std::result::Result<(), String> {
        let origin_url = match product.primary_image() {
            Some(image) => image.origin_url.clone(),
            None => return Err("record has no images".to_string()),
        };

        let response = self
            .http
            .get(&origin_url)
            .send()
            .await
            .map_err(|e| format!("image download from '{origin_url}' failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!(
                "image download from '{origin_url}' returned status {status}"
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("image body read from '{origin_url}' failed: {e}"))?;

        let key = asset_key(&product.sku);
        let hosted_url = self
            .store
            .upload(&key, bytes, "image/jpeg")
            .await
            .map_err(|e| format!("asset upload of '{key}' failed: {e}"))?;

        debug!(sku = %product.sku, url = %hosted_url, "image re-hosted");
        if let Some(image) = product.primary_image_mut() {
            image.hosted_url = Some(hosted_url);
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for FetchStage {
    type Input = Product;
    type Output = Product;

    fn name(&self) -> &'static str {
        "fetch-asset"
    }

    async fn process(&self, mut product: Product) -> Result<Outcome<Product>> {
        let snapshot = product.snapshot();
        match self.fetch(&mut product).await {
            Ok(()) => Ok(Outcome::Success(product)),
            Err(reason) => Ok(Outcome::Failure(FailureRecord::new(
                self.name(),
                snapshot,
                reason,
            ))),
        }
    }
}

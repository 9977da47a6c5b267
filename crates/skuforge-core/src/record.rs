//! The product record enriched by the pipeline.
//!
//! A [`Product`] is parsed from one feed row, carried through the fetch,
//! embed, and persist stages, and mutated in place as each stage adds what
//! it produced. After persist a record is never mutated again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single product record.
///
/// The business key (`sku`) is unique within one pipeline run. Embeddings
/// start out empty and are populated by the embed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Business key from the feed (`pid` / `sku` column).
    pub sku: String,
    pub header: ProductHeader,
    /// Free-form attribute map (color, pattern, material, ...).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub image_embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub text_embedding: Option<Vec<f32>>,
}

/// Descriptive header block of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductHeader {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand: Option<String>,
    /// Category path from root to leaf.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Image references; the first entry is the primary image.
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// Reference to a product image.
///
/// `origin_url` points at the upstream source; `hosted_url` is filled in by
/// the fetch stage once the bytes have been re-hosted in our object store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub origin_url: String,
    #[serde(default)]
    pub hosted_url: Option<String>,
}

impl ImageRef {
    pub fn new<S: Into<String>>(origin_url: S) -> Self {
        Self {
            origin_url: origin_url.into(),
            hosted_url: None,
        }
    }
}

impl Product {
    /// Create a minimal product with the given business key and name.
    pub fn new<S: Into<String>, N: Into<String>>(sku: S, name: N) -> Self {
        Self {
            sku: sku.into(),
            header: ProductHeader {
                name: name.into(),
                description: String::new(),
                brand: None,
                categories: Vec::new(),
                images: Vec::new(),
            },
            attributes: BTreeMap::new(),
            image_embedding: None,
            text_embedding: None,
        }
    }

    /// The text handed to the embedding provider alongside the image:
    /// name, description, and brand joined into one string.
    pub fn contextual_text(&self) -> String {
        let mut parts = vec![self.header.name.as_str()];
        if !self.header.description.is_empty() {
            parts.push(self.header.description.as_str());
        }
        if let Some(brand) = self.header.brand.as_deref() {
            if !brand.is_empty() {
                parts.push(brand);
            }
        }
        parts.join(" ")
    }

    /// The primary image, if the record has any images at all.
    pub fn primary_image(&self) -> Option<&ImageRef> {
        self.header.images.first()
    }

    /// Mutable access to the primary image.
    pub fn primary_image_mut(&mut self) -> Option<&mut ImageRef> {
        self.header.images.first_mut()
    }

    /// True once both embedding vectors are populated.
    pub fn has_embeddings(&self) -> bool {
        self.image_embedding.is_some() && self.text_embedding.is_some()
    }
}

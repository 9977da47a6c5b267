//! Skuforge-Core: Shared types, errors, and configuration.
//!
//! This crate provides common functionality used across skuforge:
//!
//! - **Error Handling**: The workspace-wide [`Error`] enum and [`Result`] alias
//! - **Typed IDs**: [`RunId`] for tagging pipeline runs
//! - **Product Model**: [`Product`] and its header/image/attribute blocks
//! - **Feed Types**: [`feed::RawRow`] and [`feed::FeedSchema`] for delimited input
//! - **Configuration**: serde types for the TOML config file
//!
//! # Examples
//!
//! ```
//! use skuforge_core::{Error, Product, Result, RunId};
//!
//! // Tag a pipeline run
//! let run_id = RunId::new();
//!
//! // Build a product and derive its embedding text
//! let product = Product::new("SKU-1", "Denim Jacket");
//! assert!(product.contextual_text().contains("Denim Jacket"));
//!
//! // Use the common error types
//! fn example() -> Result<()> {
//!     Err(Error::validation("missing product name"))
//! }
//! # let _ = (run_id, example());
//! ```

pub mod config;
pub mod error;
pub mod feed;
pub mod ids;
pub mod record;

pub use config::Config;
pub use error::{Error, Result};
pub use ids::RunId;
pub use record::{ImageRef, Product, ProductHeader};

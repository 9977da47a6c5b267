//! Application configuration types.
//!
//! The top-level [`Config`] is deserialized from TOML and carries the
//! sections for the feed, asset store, embedding provider, copy generation,
//! warehouse, and pipeline tuning. Every section defaults sensibly so an
//! empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub assets: AssetConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub warehouse: WarehouseConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Where the product feed lives and how its lines are split.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_path")]
    pub path: String,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Optional cap on the number of data rows read per run.
    #[serde(default)]
    pub row_limit: Option<usize>,
}

fn default_feed_path() -> String {
    "./products.csv".to_string()
}
fn default_delimiter() -> char {
    ','
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            path: default_feed_path(),
            delimiter: default_delimiter(),
            row_limit: None,
        }
    }
}

/// Object store for re-hosted product images.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetConfig {
    /// Directory the filesystem store writes under.
    #[serde(default = "default_asset_root")]
    pub root: String,

    /// URL prefix stored on records for re-hosted assets.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_asset_root() -> String {
    "./assets".to_string()
}
fn default_public_base_url() -> String {
    "local://assets".to_string()
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: default_asset_root(),
            public_base_url: default_public_base_url(),
        }
    }
}

/// Embedding provider settings.
///
/// With no `endpoint` configured the deterministic stub provider is used,
/// which keeps offline runs and tests fully local.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Length of the returned vectors.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Env var holding the bearer token for the remote endpoint.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    "multimodalembedding".to_string()
}
fn default_dimension() -> usize {
    1408
}
fn default_token_env() -> String {
    "SKUFORGE_API_TOKEN".to_string()
}
fn default_requests_per_second() -> u32 {
    5
}
fn default_request_timeout() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: default_model(),
            dimension: default_dimension(),
            token_env: default_token_env(),
            requests_per_second: default_requests_per_second(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl EmbeddingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Marketing-copy generation for records with an empty description.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_output_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    0.5
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Warehouse the enriched rows land in.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WarehouseConfig {
    /// SQLite database path.
    #[serde(default = "default_warehouse_path")]
    pub path: String,
}

fn default_warehouse_path() -> String {
    "./skuforge.db".to_string()
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            path: default_warehouse_path(),
        }
    }
}

/// Pipeline tuning knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Concurrent in-flight records per stage (and parallel chain width).
    #[serde(default = "default_max_parallelism")]
    pub max_parallelism: usize,

    /// Per-record stage call timeout; a timeout routes the record to the
    /// failure branch.
    #[serde(default = "default_item_timeout")]
    pub item_timeout_secs: u64,

    /// Optional JSON-lines file failures are appended to, in addition to
    /// the log.
    #[serde(default)]
    pub failures_path: Option<String>,
}

fn default_max_parallelism() -> usize {
    num_cpus::get()
}
fn default_item_timeout() -> u64 {
    30
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_parallelism: default_max_parallelism(),
            item_timeout_secs: default_item_timeout(),
            failures_path: None,
        }
    }
}

impl PipelineConfig {
    pub fn item_timeout(&self) -> Duration {
        Duration::from_secs(self.item_timeout_secs)
    }
}

impl Config {
    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(Error::validation("embedding.dimension must be positive"));
        }
        if self.embedding.requests_per_second == 0 {
            return Err(Error::validation(
                "embedding.requests_per_second must be positive",
            ));
        }
        if self.pipeline.max_parallelism == 0 {
            return Err(Error::validation("pipeline.max_parallelism must be positive"));
        }
        if self.pipeline.item_timeout_secs == 0 {
            return Err(Error::validation("pipeline.item_timeout_secs must be positive"));
        }
        if !(0.0..=1.0).contains(&self.generation.temperature) {
            return Err(Error::validation(
                "generation.temperature must be between 0.0 and 1.0",
            ));
        }
        Ok(())
    }
}

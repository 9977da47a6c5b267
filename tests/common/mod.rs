//! Shared test harness for integration tests.
//!
//! Provides [`PipelineHarness`] which wires the standard stage path to
//! in-process collaborators: an in-memory object store, a stub embedder,
//! an in-memory warehouse and an in-memory failure sink. Tests can drive
//! real feed text end to end without leaving the process; image origins
//! are the only external piece, and tests that need one mount a
//! `wiremock` server.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use skuforge_core::feed::FeedSchema;
use skuforge_pipeline::{MemorySink, Pipeline, PipelineOptions};
use skuforge_pipeline::{EmbedStage, FetchStage, ParseStage, PersistStage};
use skuforge_providers::{MemoryObjectStore, MemoryWarehouse, StubEmbedder};

/// Header used by most feed fixtures.
pub const FEED_HEADER: &str = "sku,name,description,brand,image";

/// Stub embedding width; small keeps assertions readable.
pub const EMBED_DIM: usize = 32;

/// Test harness wrapping a fully-constructed pipeline backed by in-memory
/// collaborators.
pub struct PipelineHarness {
    pub store: Arc<MemoryObjectStore>,
    pub warehouse: Arc<MemoryWarehouse>,
    pub sink: Arc<MemorySink>,
    pub pipeline: Pipeline,
}

impl PipelineHarness {
    /// Create a new harness over the parse → fetch → embed → persist path
    /// for [`FEED_HEADER`].
    pub fn new() -> Self {
        Self::with_header(FEED_HEADER)
    }

    /// Create a new harness for a custom comma-delimited header.
    pub fn with_header(header: &str) -> Self {
        let schema = FeedSchema::from_header(header, ',').expect("valid header");
        let store = Arc::new(MemoryObjectStore::new());
        let warehouse = Arc::new(MemoryWarehouse::new());
        let sink = Arc::new(MemorySink::new());

        let pipeline = Pipeline::new(Arc::new(ParseStage::new(schema, ',')), sink.clone())
            .with_stage(Arc::new(FetchStage::new(
                reqwest::Client::new(),
                store.clone(),
            )))
            .with_stage(Arc::new(EmbedStage::new(Arc::new(StubEmbedder::new(
                EMBED_DIM,
            )))))
            .with_stage(Arc::new(PersistStage::new(warehouse.clone())))
            .with_options(PipelineOptions {
                max_in_flight: 4,
                item_timeout: Duration::from_secs(5),
            });

        Self {
            store,
            warehouse,
            sink,
            pipeline,
        }
    }
}

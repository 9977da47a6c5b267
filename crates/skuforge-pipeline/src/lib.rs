//! Skuforge-Pipeline: Staged enrichment with a two-branch dataflow.
//!
//! Records move through a fixed stage order: parse, fetch-asset, describe
//! (optional), embed, persist. Every stage splits its input into a success
//! branch and a failure branch; failures carry a [`FailureRecord`] to the
//! configured [`FailureSink`] and drop out of the run without stopping it.
//! Only a contract violation ([`skuforge_core::Error::Contract`]) aborts
//! the run.
//!
//! The [`Pipeline`] driver runs either a finite batch (stage by stage,
//! order preserved) or an unbounded stream (record by record, bounded
//! concurrency). See [`driver`] for the exact semantics.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use skuforge_core::feed::{FeedSchema, RawRow};
//! use skuforge_pipeline::{LogSink, ParseStage, Pipeline};
//!
//! # async fn run() -> skuforge_core::Result<()> {
//! let schema = FeedSchema::from_header("sku|name|description", '|')?;
//! let pipeline = Pipeline::new(
//!     Arc::new(ParseStage::new(schema, '|')),
//!     Arc::new(LogSink::new()),
//! );
//! let summary = pipeline
//!     .run_batch(vec![RawRow::new(2, "SKU-1|Denim Jacket|")])
//!     .await?;
//! assert_eq!(summary.persisted, 1);
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod outcome;
pub mod partition;
pub mod sink;
pub mod stage;
pub mod stages;

pub use driver::{Pipeline, PipelineOptions, RunSummary, StageCount};
pub use outcome::{FailureRecord, Outcome, Snapshot};
pub use partition::partition;
pub use sink::{FailureSink, FanoutSink, JsonlSink, LogSink, MemorySink};
pub use stage::{RecordStage, RowStage, Stage};
pub use stages::{DescribeStage, EmbedStage, FetchStage, ParseStage, PersistStage};

//! The per-record processing step abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use skuforge_core::feed::RawRow;
use skuforge_core::{Product, Result};

use crate::outcome::Outcome;

/// One unit of per-record enrichment.
///
/// `process` consumes the input and returns `Ok(Outcome::Failure(..))` for
/// every expected domain failure (malformed input, unreachable asset,
/// provider error). The outer `Err` is reserved for contract violations —
/// a record arriving in a state an earlier stage should have ruled out —
/// and aborts the whole run.
#[async_trait]
pub trait Stage: Send + Sync {
    type Input: Send;
    type Output: Send;

    /// Stage name used in failure records and logs.
    fn name(&self) -> &'static str;

    async fn process(&self, input: Self::Input) -> Result<Outcome<Self::Output>>;
}

/// The head stage turning raw feed rows into product records.
pub type RowStage = Arc<dyn Stage<Input = RawRow, Output = Product>>;

/// A record-to-record enrichment stage.
pub type RecordStage = Arc<dyn Stage<Input = Product, Output = Product>>;

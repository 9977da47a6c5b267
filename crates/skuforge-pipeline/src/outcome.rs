//! Tagged per-item results.
//!
//! Every stage call produces an [`Outcome`]: the enriched value on success,
//! or a [`FailureRecord`] carrying enough provenance (stage name, input
//! snapshot, reason, timestamp) that the item can be diagnosed or re-queued
//! later. Expected domain failures are data here, not errors; the
//! `skuforge_core::Error` path is reserved for contract violations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skuforge_core::feed::RawRow;
use skuforge_core::Product;

/// Result of pushing one item through one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure(FailureRecord),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// The success value, discarding a failure.
    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }
}

/// One item that fell off the success path.
///
/// This is the only artifact the pipeline produces outside the success
/// branch; sinks persist it as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Name of the stage that produced the failure.
    pub stage: String,
    /// Snapshot of the input as it entered the stage.
    pub input_snapshot: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl FailureRecord {
    pub fn new<S, I, R>(stage: S, input_snapshot: I, reason: R) -> Self
    where
        S: Into<String>,
        I: Into<String>,
        R: Into<String>,
    {
        Self {
            stage: stage.into(),
            input_snapshot: input_snapshot.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Diagnostics snapshot of a stage input.
///
/// Raw rows snapshot as their source line; products as their JSON form.
/// The driver captures the snapshot before handing the input to a stage so
/// a timeout can still produce a complete [`FailureRecord`].
pub trait Snapshot {
    fn snapshot(&self) -> String;
}

impl Snapshot for RawRow {
    fn snapshot(&self) -> String {
        self.raw.clone()
    }
}

impl Snapshot for Product {
    fn snapshot(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.sku.clone())
    }
}

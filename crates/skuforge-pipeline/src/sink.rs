//! Destinations for failure records.
//!
//! The driver hands every [`FailureRecord`] to one [`FailureSink`]. Sinks
//! are diagnostics plumbing: a sink that cannot write logs the problem and
//! drops the record rather than failing the run.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use skuforge_core::Result;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::outcome::FailureRecord;

/// Receives every record that fell off the success path.
#[async_trait]
pub trait FailureSink: Send + Sync {
    async fn record(&self, failure: &FailureRecord);
}

/// Logs each failure with structured fields.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FailureSink for LogSink {
    async fn record(&self, failure: &FailureRecord) {
        warn!(
            stage = %failure.stage,
            reason = %failure.reason,
            input = %truncate(&failure.input_snapshot, 160),
            "record failed"
        );
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Appends each failure as one JSON line.
pub struct JsonlSink {
    file: tokio::sync::Mutex<tokio::fs::File>,
}

impl JsonlSink {
    /// Open `path` for appending, creating it if needed.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .await?;
        Ok(Self {
            file: tokio::sync::Mutex::new(file),
        })
    }
}

#[async_trait]
impl FailureSink for JsonlSink {
    async fn record(&self, failure: &FailureRecord) {
        let mut line = match serde_json::to_string(failure) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to encode failure record; dropping");
                return;
            }
        };
        line.push('\n');

        let mut file = self.file.lock().await;
        if let Err(e) = file.write_all(line.as_bytes()).await {
            warn!(error = %e, "failed to append failure record; dropping");
        }
    }
}

/// Collects failures in memory for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: parking_lot::Mutex<Vec<FailureRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded failures, in arrival order.
    pub fn records(&self) -> Vec<FailureRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl FailureSink for MemorySink {
    async fn record(&self, failure: &FailureRecord) {
        self.records.lock().push(failure.clone());
    }
}

/// Forwards each failure to every inner sink.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn FailureSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn FailureSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl FailureSink for FanoutSink {
    async fn record(&self, failure: &FailureRecord) {
        for sink in &self.sinks {
            sink.record(failure).await;
        }
    }
}

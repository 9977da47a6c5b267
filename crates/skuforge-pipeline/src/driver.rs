//! Batch and streaming pipeline drivers.
//!
//! A [`Pipeline`] is a head stage (raw row -> record) followed by record
//! stages in fixed order, with a partition point after every stage. The
//! batch driver sweeps all rows through one stage before the next starts;
//! the streaming driver gives each arriving row its own bounded task and
//! drives it down the whole stage path. Both route failures to the
//! configured sink, apply a per-item stage timeout, and stop dispatching
//! once the cancellation token fires while letting in-flight work finish.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{future, stream, StreamExt};
use serde::Serialize;
use skuforge_core::feed::RawRow;
use skuforge_core::{Error, Product, Result, RunId};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::outcome::{FailureRecord, Outcome, Snapshot};
use crate::partition::partition;
use crate::sink::FailureSink;
use crate::stage::{RecordStage, RowStage, Stage};

/// Reasons kept for the run-summary sample.
const FAILURE_SAMPLE_LIMIT: usize = 5;

/// Driver tuning.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Concurrent in-flight records per stage.
    pub max_in_flight: usize,
    /// Budget for one stage call on one record; exceeding it routes the
    /// record to the failure branch.
    pub item_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_in_flight: num_cpus::get(),
            item_timeout: Duration::from_secs(30),
        }
    }
}

/// Per-stage traffic counts for one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct StageCount {
    pub stage: String,
    /// Records offered to the stage. Under cancellation this can exceed
    /// `succeeded + failed`.
    pub input: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// What one batch run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub rows_read: usize,
    pub stages: Vec<StageCount>,
    /// Records that survived every stage including persist.
    pub persisted: usize,
    pub failures: usize,
    /// First few failure reasons, for the log and the CLI.
    pub failure_sample: Vec<String>,
    pub cancelled: bool,
}

/// Composes the stages and drives records through them.
pub struct Pipeline {
    head: RowStage,
    stages: Vec<RecordStage>,
    sink: Arc<dyn FailureSink>,
    options: PipelineOptions,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(head: RowStage, sink: Arc<dyn FailureSink>) -> Self {
        Self {
            head,
            stages: Vec::new(),
            sink,
            options: PipelineOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Append a record stage; stages run in append order.
    pub fn with_stage(mut self, stage: RecordStage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops dispatch when cancelled; in-flight stage calls
    /// complete or hit their timeout.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn width(&self) -> usize {
        self.options.max_in_flight.max(1)
    }

    /// Drive a finite batch of rows through every stage.
    ///
    /// The driver holds no state across runs: re-running the same input
    /// against idempotent collaborators reproduces the same outcome split.
    ///
    /// # Errors
    ///
    /// Returns the first contract violation raised by a stage; the run is
    /// cancelled and must not be resumed.
    pub async fn run_batch(&self, rows: Vec<RawRow>) -> Result<RunSummary> {
        let run_id = RunId::new();
        let rows_read = rows.len();
        info!(%run_id, rows = rows_read, "batch run starting");

        let mut counts = Vec::new();
        let mut failure_sample = Vec::new();
        let mut failures_total = 0usize;

        let offered = rows.len();
        let outcomes = self.sweep(Arc::clone(&self.head), rows).await?;
        let mut records = self
            .settle(
                self.head.name(),
                offered,
                outcomes,
                &mut counts,
                &mut failure_sample,
                &mut failures_total,
            )
            .await;

        for stage in &self.stages {
            let offered = records.len();
            let outcomes = self.sweep(Arc::clone(stage), records).await?;
            records = self
                .settle(
                    stage.name(),
                    offered,
                    outcomes,
                    &mut counts,
                    &mut failure_sample,
                    &mut failures_total,
                )
                .await;
        }

        let summary = RunSummary {
            run_id,
            rows_read,
            stages: counts,
            persisted: records.len(),
            failures: failures_total,
            failure_sample,
            cancelled: self.cancel.is_cancelled(),
        };
        info!(
            %run_id,
            persisted = summary.persisted,
            failures = summary.failures,
            cancelled = summary.cancelled,
            "batch run finished"
        );
        Ok(summary)
    }

    /// Drive rows from an unbounded source until it closes or the token
    /// is cancelled.
    ///
    /// Each row runs the whole stage path in its own task, bounded by
    /// `max_in_flight`; failures go to the sink continuously.
    ///
    /// # Errors
    ///
    /// A contract violation in any task cancels the run and is returned
    /// once in-flight tasks have drained.
    pub async fn run_streaming(&self, mut source: mpsc::UnboundedReceiver<RawRow>) -> Result<()> {
        let run_id = RunId::new();
        info!(%run_id, "streaming run starting");

        let width = self.width();
        let semaphore = Arc::new(Semaphore::new(width));
        let violation: Arc<parking_lot::Mutex<Option<Error>>> =
            Arc::new(parking_lot::Mutex::new(None));
        let processed = Arc::new(AtomicUsize::new(0));

        loop {
            let row = tokio::select! {
                _ = self.cancel.cancelled() => break,
                row = source.recv() => match row {
                    Some(row) => row,
                    None => break,
                },
            };

            let permit = tokio::select! {
                _ = self.cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let head = Arc::clone(&self.head);
            let stages = self.stages.clone();
            let sink = Arc::clone(&self.sink);
            let cancel = self.cancel.clone();
            let violation = Arc::clone(&violation);
            let processed = Arc::clone(&processed);
            let timeout = self.options.item_timeout;

            tokio::spawn(async move {
                let _permit = permit;
                match drive_one(row, &head, &stages, sink.as_ref(), timeout).await {
                    Ok(()) => {
                        processed.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        let mut slot = violation.lock();
                        if slot.is_none() {
                            *slot = Some(e);
                        }
                        drop(slot);
                        cancel.cancel();
                    }
                }
            });
        }

        // Taking every permit back means every task has finished.
        let _ = semaphore.acquire_many(width as u32).await;

        if let Some(e) = violation.lock().take() {
            return Err(e);
        }
        info!(
            %run_id,
            processed = processed.load(Ordering::Relaxed),
            cancelled = self.cancel.is_cancelled(),
            "streaming run stopped"
        );
        Ok(())
    }

    /// Run all inputs through one stage with bounded, order-preserving
    /// concurrency. Cancellation stops dispatch; a contract violation
    /// cancels the run and aborts the sweep.
    async fn sweep<I, O>(
        &self,
        stage: Arc<dyn Stage<Input = I, Output = O>>,
        inputs: Vec<I>,
    ) -> Result<Vec<Outcome<O>>>
    where
        I: Snapshot + Send,
        O: Send,
    {
        let cancel = &self.cancel;
        let timeout = self.options.item_timeout;

        let mut results = stream::iter(inputs)
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|input| {
                let stage = Arc::clone(&stage);
                async move { call_one(stage.as_ref(), input, timeout).await }
            })
            .buffered(self.width());

        let mut outcomes = Vec::new();
        while let Some(result) = results.next().await {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    self.cancel.cancel();
                    return Err(e);
                }
            }
        }
        Ok(outcomes)
    }

    /// Partition a stage's outcomes, sink the failures, and record the
    /// stage's traffic counts.
    async fn settle(
        &self,
        stage: &str,
        offered: usize,
        outcomes: Vec<Outcome<Product>>,
        counts: &mut Vec<StageCount>,
        sample: &mut Vec<String>,
        failures_total: &mut usize,
    ) -> Vec<Product> {
        let (survivors, failures) = partition(outcomes);
        for failure in &failures {
            if sample.len() < FAILURE_SAMPLE_LIMIT {
                sample.push(format!("{}: {}", failure.stage, failure.reason));
            }
            self.sink.record(failure).await;
        }

        debug!(
            stage,
            offered,
            ok = survivors.len(),
            failed = failures.len(),
            "stage swept"
        );
        counts.push(StageCount {
            stage: stage.to_string(),
            input: offered,
            succeeded: survivors.len(),
            failed: failures.len(),
        });
        *failures_total += failures.len();
        survivors
    }
}

/// Call one stage on one input, snapshotting first so a timeout still
/// yields a complete failure record.
async fn call_one<I, O>(
    stage: &dyn Stage<Input = I, Output = O>,
    input: I,
    timeout: Duration,
) -> Result<Outcome<O>>
where
    I: Snapshot + Send,
    O: Send,
{
    let snapshot = input.snapshot();
    match tokio::time::timeout(timeout, stage.process(input)).await {
        Ok(result) => result,
        Err(_) => Ok(Outcome::Failure(FailureRecord::new(
            stage.name(),
            snapshot,
            format!("stage timed out after {timeout:?}"),
        ))),
    }
}

/// Drive one raw row down the whole stage path, sinking its failure if it
/// falls off. `Err` is a contract violation.
async fn drive_one(
    row: RawRow,
    head: &RowStage,
    stages: &[RecordStage],
    sink: &dyn FailureSink,
    timeout: Duration,
) -> Result<()> {
    let mut record = match call_one(head.as_ref(), row, timeout).await? {
        Outcome::Success(record) => record,
        Outcome::Failure(failure) => {
            sink.record(&failure).await;
            return Ok(());
        }
    };

    for stage in stages {
        record = match call_one(stage.as_ref(), record, timeout).await? {
            Outcome::Success(record) => record,
            Outcome::Failure(failure) => {
                sink.record(&failure).await;
                return Ok(());
            }
        };
    }
    Ok(())
}

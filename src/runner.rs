//! Run orchestration: setup chain, pipeline assembly, batch and
//! streaming execution.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use skuforge_chain::{CommandState, Context};
use skuforge_core::feed::{FeedSchema, RawRow};
use skuforge_core::Config;
use skuforge_pipeline::{
    DescribeStage, EmbedStage, FailureSink, FanoutSink, FetchStage, JsonlSink, LogSink,
    ParseStage, PersistStage, Pipeline, PipelineOptions, RunSummary,
};
use skuforge_providers::{
    EmbeddingProvider, FsObjectStore, GenerationParams, ObjectStore, RemoteEmbeddingClient,
    StubEmbedder, Warehouse,
};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::commands::{build_setup_chain, keys};
use crate::feed;

/// Run the setup chain and pull the handles it produced.
async fn setup(config_path: Option<&Path>) -> Result<(Arc<Config>, Arc<dyn Warehouse>)> {
    let ctx = Context::new();
    let chain = build_setup_chain(config_path.map(Path::to_path_buf));
    let report = chain.run(&ctx).await;
    if let Some(err) = report.to_error() {
        anyhow::bail!("setup failed: {err}");
    }

    let config = ctx
        .get(&keys::CONFIG)
        .context("configuration missing after setup")?;
    let warehouse: Arc<dyn Warehouse> = ctx
        .get(&keys::WAREHOUSE)
        .context("warehouse missing after setup")?;
    Ok((config, warehouse))
}

/// Remote provider when an endpoint is configured, stub otherwise.
fn build_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    match &config.embedding.endpoint {
        Some(endpoint) => {
            let client = RemoteEmbeddingClient::new(&config.embedding)?;
            info!(provider = client.name(), %endpoint, "using remote embedding provider");
            Ok(Arc::new(client))
        }
        None => {
            let stub = StubEmbedder::new(config.embedding.dimension);
            info!(
                provider = stub.name(),
                dimension = config.embedding.dimension,
                "no embedding endpoint configured, using local stub"
            );
            Ok(Arc::new(stub))
        }
    }
}

/// Always the log sink; additionally a JSON-lines file when configured.
async fn build_sink(config: &Config) -> Result<Arc<dyn FailureSink>> {
    match &config.pipeline.failures_path {
        Some(path) => {
            let jsonl = JsonlSink::open(path).await?;
            info!(path = %path, "appending failure records to file");
            Ok(Arc::new(FanoutSink::new(vec![
                Arc::new(LogSink::new()),
                Arc::new(jsonl),
            ])))
        }
        None => Ok(Arc::new(LogSink::new())),
    }
}

/// Assemble the full stage path for one run.
async fn build_pipeline(
    config: &Config,
    schema: FeedSchema,
    warehouse: Arc<dyn Warehouse>,
    cancel: CancellationToken,
) -> Result<Pipeline> {
    let provider = build_provider(config)?;
    let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(
        config.assets.root.clone(),
        config.assets.public_base_url.clone(),
    ));
    let http = reqwest::Client::builder()
        .timeout(config.embedding.request_timeout())
        .build()
        .context("failed to build HTTP client")?;

    let mut pipeline = Pipeline::new(
        Arc::new(ParseStage::new(schema, config.feed.delimiter)),
        build_sink(config).await?,
    )
    .with_stage(Arc::new(FetchStage::new(http, store)));

    if config.generation.enabled {
        let params = GenerationParams {
            max_output_tokens: config.generation.max_output_tokens,
            temperature: config.generation.temperature,
        };
        pipeline = pipeline.with_stage(Arc::new(DescribeStage::new(provider.clone(), params)));
    }

    Ok(pipeline
        .with_stage(Arc::new(EmbedStage::new(provider)))
        .with_stage(Arc::new(PersistStage::new(warehouse)))
        .with_options(PipelineOptions {
            max_in_flight: config.pipeline.max_parallelism,
            item_timeout: config.pipeline.item_timeout(),
        })
        .with_cancellation(cancel))
}

fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping dispatch");
            cancel.cancel();
        }
    });
}

fn print_summary(summary: &RunSummary) {
    println!("Run {} complete", summary.run_id);
    println!("  Rows read: {}", summary.rows_read);
    for stage in &summary.stages {
        println!(
            "  {:12} {} in, {} ok, {} failed",
            stage.stage, stage.input, stage.succeeded, stage.failed
        );
    }
    println!("  Persisted: {}", summary.persisted);
    println!("  Failures:  {}", summary.failures);
    if summary.cancelled {
        println!("  (run was cancelled before completing)");
    }
    if !summary.failure_sample.is_empty() {
        println!("  First failures:");
        for reason in &summary.failure_sample {
            println!("    - {reason}");
        }
    }
}

/// Batch mode: read the whole feed, run it through every stage, print the
/// summary.
pub async fn run_batch(
    config_path: Option<&Path>,
    feed_override: Option<&Path>,
    limit: Option<usize>,
) -> Result<()> {
    let (config, warehouse) = setup(config_path).await?;
    let mut config = (*config).clone();
    if let Some(path) = feed_override {
        config.feed.path = path.to_string_lossy().into_owned();
    }
    if limit.is_some() {
        config.feed.row_limit = limit;
    }

    let feed_path = PathBuf::from(&config.feed.path);
    let (schema, rows) = feed::read_feed(&feed_path, &config.feed).await?;

    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    let pipeline = build_pipeline(&config, schema, warehouse, cancel).await?;
    let summary = pipeline.run_batch(rows).await?;
    print_summary(&summary);
    Ok(())
}

/// Streaming mode: header then data rows on stdin, until EOF or Ctrl-C.
pub async fn run_stream(config_path: Option<&Path>) -> Result<()> {
    let (config, warehouse) = setup(config_path).await?;
    let config = (*config).clone();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let header = lines
        .next_line()
        .await?
        .filter(|line| !line.trim().is_empty())
        .context("no header line on stdin")?;
    let schema = FeedSchema::from_header(&header, config.feed.delimiter)?;

    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());
    let pipeline = build_pipeline(&config, schema, warehouse, cancel).await?;

    let (tx, rx) = mpsc::unbounded_channel();
    let forwarder = tokio::spawn(async move {
        // The header was line 1.
        let mut line_number = 1usize;
        while let Ok(Some(line)) = lines.next_line().await {
            line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            if tx.send(RawRow::new(line_number, line)).is_err() {
                break;
            }
        }
    });

    println!("Reading rows from stdin; Ctrl-C stops the run.");
    pipeline.run_streaming(rx).await?;
    forwarder.abort();
    Ok(())
}

/// Check mode: run only the setup chain and report per-command outcomes.
pub async fn run_check(config_path: Option<&Path>) -> Result<()> {
    println!("Running setup chain...\n");

    let ctx = Context::new();
    let chain = build_setup_chain(config_path.map(Path::to_path_buf));
    let report = chain.run(&ctx).await;

    let mut all_ok = true;
    for entry in report.entries() {
        let status = match &entry.state {
            CommandState::Completed => "✓",
            CommandState::Skipped => "-",
            CommandState::Failed(_) => {
                all_ok = false;
                "✗"
            }
            CommandState::Pending | CommandState::Running => "?",
        };
        print!("{} {}", status, entry.command);
        if let CommandState::Failed(reason) = &entry.state {
            print!(" ({reason})");
        }
        println!();
    }

    println!();
    if let Some(warehouse) = ctx.get(&keys::WAREHOUSE) {
        println!("Warehouse rows: {}", warehouse.count().await?);
    }
    if all_ok {
        println!("Setup is healthy.");
        Ok(())
    } else {
        anyhow::bail!("setup reported failures")
    }
}

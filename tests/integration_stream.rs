//! Integration tests for the streaming entry point.
//!
//! Streaming runs the whole stage path per record as rows arrive, so these
//! tests exercise drain-on-close, cancellation, and the per-subscription
//! duplicate tracking. Rows without images stop at the fetch stage, which
//! keeps most tests free of HTTP.

mod common;

use std::time::Duration;

use common::PipelineHarness;
use skuforge_core::feed::RawRow;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_streaming_rows_persist_as_they_arrive() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img/1.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg bytes".to_vec()))
        .mount(&server)
        .await;

    let harness = PipelineHarness::new();
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(RawRow::new(
        2,
        format!("SKU-1,Streamed Jacket,Warm,Acme,{}/img/1.jpg", server.uri()),
    ))
    .unwrap();
    tx.send(RawRow::new(3, ",Missing Key,,,")).unwrap();
    drop(tx);

    harness.pipeline.run_streaming(rx).await.unwrap();

    assert_eq!(harness.warehouse.len(), 1);
    assert_eq!(harness.warehouse.rows()[0].sku, "SKU-1");
    assert_eq!(
        harness.warehouse.rows()[0].image_url,
        "memory://images/SKU-1.jpg"
    );

    let records = harness.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].stage, "parse");
}

#[tokio::test]
async fn test_streaming_drains_in_flight_work_on_close() {
    let harness = PipelineHarness::new();
    let (tx, rx) = mpsc::unbounded_channel();

    // No image column, so every row parses and then stops at fetch.
    for i in 0..5usize {
        tx.send(RawRow::new(i + 2, format!("SKU-{i},Imageless Item,,,")))
            .unwrap();
    }
    drop(tx);

    harness.pipeline.run_streaming(rx).await.unwrap();

    let records = harness.sink.records();
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.stage == "fetch-asset"));
    assert!(harness.warehouse.is_empty());
}

#[tokio::test]
async fn test_streaming_stops_on_cancellation() {
    let PipelineHarness { pipeline, sink, .. } = PipelineHarness::new();
    let cancel = pipeline.cancellation_token();

    let (tx, rx) = mpsc::unbounded_channel();
    let run = tokio::spawn(async move { pipeline.run_streaming(rx).await });

    tx.send(RawRow::new(2, "SKU-1,Lone Shirt,,,")).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The sender stays open; only cancellation can end the run.
    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .expect("run returns promptly after cancellation")
        .expect("task joins");
    result.unwrap();

    assert_eq!(sink.len(), 1);
    drop(tx);
}

#[tokio::test]
async fn test_streaming_tracks_duplicates_across_the_subscription() {
    let harness = PipelineHarness::new();
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(RawRow::new(2, "SKU-1,First Listing,,,")).unwrap();
    tx.send(RawRow::new(3, "SKU-1,Second Listing,,,")).unwrap();
    drop(tx);

    harness.pipeline.run_streaming(rx).await.unwrap();

    let records = harness.sink.records();
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .any(|r| r.stage == "parse" && r.reason.contains("duplicate business key")));
    assert!(records.iter().any(|r| r.stage == "fetch-asset"));
}

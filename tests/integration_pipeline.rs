//! Integration tests for the batch enrichment pipeline.
//!
//! Each test drives real feed text through the full parse → fetch →
//! embed → persist path against in-process collaborators. Image origins
//! are served by `wiremock`, so nothing leaves the host.

mod common;

use common::{PipelineHarness, EMBED_DIM, FEED_HEADER};
use skuforge_core::config::FeedConfig;
use skuforge_core::feed::RawRow;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Split feed text into data rows the way the application reader does.
fn rows_from(feed: &str) -> Vec<RawRow> {
    let (_, rows) = skuforge::feed::parse_feed(feed, &FeedConfig::default()).expect("feed parses");
    rows
}

async fn serve_image(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg bytes".to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_clean_feed_lands_in_warehouse() {
    let server = MockServer::start().await;
    serve_image(&server, "/img/1.jpg").await;
    serve_image(&server, "/img/2.jpg").await;

    let harness = PipelineHarness::new();
    let feed = format!(
        "{FEED_HEADER}\n\
         SKU-1,Denim Jacket,Classic blue denim,Acme,{base}/img/1.jpg\n\
         SKU-2,Plain Shirt,Everyday cotton,Acme,{base}/img/2.jpg\n",
        base = server.uri()
    );

    let summary = harness.pipeline.run_batch(rows_from(&feed)).await.unwrap();

    assert_eq!(summary.rows_read, 2);
    assert_eq!(summary.persisted, 2);
    assert_eq!(summary.failures, 0);
    assert!(!summary.cancelled);
    assert!(harness.sink.is_empty());

    let names: Vec<&str> = summary.stages.iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(names, ["parse", "fetch-asset", "embed", "persist"]);

    let rows = harness.warehouse.rows();
    assert_eq!(rows.len(), 2);
    let first = rows.iter().find(|r| r.sku == "SKU-1").unwrap();
    assert_eq!(first.name, "Denim Jacket");
    assert_eq!(first.brand.as_deref(), Some("Acme"));
    assert_eq!(first.image_url, "memory://images/SKU-1.jpg");

    // Both embedding vectors are real JSON arrays of the stub's width.
    let image_vector: Vec<f32> = serde_json::from_str(&first.image_embedding).unwrap();
    assert_eq!(image_vector.len(), EMBED_DIM);
    let text_vector: Vec<f32> = serde_json::from_str(&first.text_embedding).unwrap();
    assert_eq!(text_vector.len(), EMBED_DIM);

    assert!(harness.store.contains("images/SKU-1.jpg"));
    assert!(harness.store.contains("images/SKU-2.jpg"));
}

#[tokio::test]
async fn test_malformed_row_is_isolated_from_the_batch() {
    let server = MockServer::start().await;
    serve_image(&server, "/img/1.jpg").await;
    serve_image(&server, "/img/3.jpg").await;
    serve_image(&server, "/img/4.jpg").await;

    let harness = PipelineHarness::new();
    let feed = format!(
        "{FEED_HEADER}\n\
         SKU-1,Denim Jacket,Classic,Acme,{base}/img/1.jpg\n\
         SKU-2,,no name on this row,Acme,{base}/img/2.jpg\n\
         SKU-3,Wool Scarf,Winter knit,Acme,{base}/img/3.jpg\n\
         SKU-4,Rain Boot,Waterproof,Acme,{base}/img/4.jpg\n",
        base = server.uri()
    );

    let summary = harness.pipeline.run_batch(rows_from(&feed)).await.unwrap();

    assert_eq!(summary.rows_read, 4);
    assert_eq!(summary.persisted, 3);
    assert_eq!(summary.failures, 1);

    // The bad row stopped at parse; later stages only saw survivors.
    let parse = summary.stages.iter().find(|s| s.stage == "parse").unwrap();
    assert_eq!((parse.input, parse.succeeded, parse.failed), (4, 3, 1));
    let fetch = summary
        .stages
        .iter()
        .find(|s| s.stage == "fetch-asset")
        .unwrap();
    assert_eq!(fetch.input, 3);

    let records = harness.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].stage, "parse");
    assert!(
        records[0].reason.contains("missing product name"),
        "got: {}",
        records[0].reason
    );
    // The snapshot is the raw line, so the row can be replayed.
    assert!(records[0].input_snapshot.starts_with("SKU-2,,"));

    assert!(harness.warehouse.rows().iter().all(|r| r.sku != "SKU-2"));
}

#[tokio::test]
async fn test_unreachable_image_keeps_status_in_reason() {
    let server = MockServer::start().await;
    serve_image(&server, "/img/1.jpg").await;
    Mock::given(method("GET"))
        .and(path("/img/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let harness = PipelineHarness::new();
    let feed = format!(
        "{FEED_HEADER}\n\
         SKU-1,Denim Jacket,Classic,Acme,{base}/img/1.jpg\n\
         SKU-2,Lost Shirt,Gone,Acme,{base}/img/missing.jpg\n",
        base = server.uri()
    );

    let summary = harness.pipeline.run_batch(rows_from(&feed)).await.unwrap();

    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.failures, 1);
    assert!(summary.failure_sample[0].starts_with("fetch-asset:"));

    let records = harness.sink.records();
    assert_eq!(records[0].stage, "fetch-asset");
    assert!(records[0].reason.contains("404"), "got: {}", records[0].reason);

    let rows = harness.warehouse.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sku, "SKU-1");
}

#[tokio::test]
async fn test_duplicate_business_key_fails_one_of_the_pair() {
    let server = MockServer::start().await;
    serve_image(&server, "/img/1.jpg").await;

    let harness = PipelineHarness::new();
    let feed = format!(
        "{FEED_HEADER}\n\
         SKU-1,First Listing,,Acme,{base}/img/1.jpg\n\
         SKU-1,Second Listing,,Acme,{base}/img/1.jpg\n",
        base = server.uri()
    );

    let summary = harness.pipeline.run_batch(rows_from(&feed)).await.unwrap();

    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.failures, 1);

    let records = harness.sink.records();
    assert_eq!(records.len(), 1);
    assert!(
        records[0].reason.contains("duplicate business key 'SKU-1'"),
        "got: {}",
        records[0].reason
    );
    assert_eq!(harness.warehouse.len(), 1);
}

#[tokio::test]
async fn test_warehouse_rejection_joins_failure_branch() {
    let server = MockServer::start().await;
    serve_image(&server, "/img/1.jpg").await;
    serve_image(&server, "/img/2.jpg").await;

    let harness = PipelineHarness::new();
    harness.warehouse.reject_sku("SKU-2");

    let feed = format!(
        "{FEED_HEADER}\n\
         SKU-1,Denim Jacket,Classic,Acme,{base}/img/1.jpg\n\
         SKU-2,Cursed Shirt,Unwanted,Acme,{base}/img/2.jpg\n",
        base = server.uri()
    );

    let summary = harness.pipeline.run_batch(rows_from(&feed)).await.unwrap();

    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.failures, 1);

    let persist = summary.stages.iter().find(|s| s.stage == "persist").unwrap();
    assert_eq!((persist.input, persist.succeeded, persist.failed), (2, 1, 1));

    let records = harness.sink.records();
    assert_eq!(records[0].stage, "persist");
    assert!(
        records[0].reason.contains("row rejected"),
        "got: {}",
        records[0].reason
    );
    assert_eq!(harness.warehouse.len(), 1);
    assert_eq!(harness.warehouse.rows()[0].sku, "SKU-1");
}

#[tokio::test]
async fn test_empty_feed_is_a_clean_run() {
    let harness = PipelineHarness::new();
    let summary = harness
        .pipeline
        .run_batch(rows_from(&format!("{FEED_HEADER}\n")))
        .await
        .unwrap();

    assert_eq!(summary.rows_read, 0);
    assert_eq!(summary.persisted, 0);
    assert_eq!(summary.failures, 0);
    assert!(harness.warehouse.is_empty());
}

//! Benchmarks for feed parsing
//!
//! Measures header alias resolution, quoted-field splitting, and collecting
//! raw rows out of whole feed files.

use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput,
};
use skuforge_core::config::FeedConfig;
use skuforge_core::feed::{split_delimited, FeedSchema};

/// Retail-export header with aliased column names.
const HEADER: &str =
    "uniq_id,product_name,description,brand,product_category_tree,image,product_specifications";

const LINE_PLAIN: &str =
    "SKU-1,Denim Jacket,Classic blue denim,Acme,Clothing >> Jackets,http://img/1.jpg,color=blue";

const LINE_QUOTED: &str = r#"SKU-2,"Jacket, Denim","A jacket with ""press"" studs",Acme,"[""Clothing >> Jackets""]",http://img/2.jpg,"{""color"":""blue""}""#;

fn feed_text(rows: usize) -> String {
    let mut feed = String::from(HEADER);
    feed.push('\n');
    for i in 0..rows {
        feed.push_str(&format!(
            "SKU-{i},Item {i},Everyday staple in heavyweight cotton,Acme,Clothing >> Basics,http://img/{i}.jpg,color=blue\n"
        ));
    }
    feed
}

fn bench_header_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("header_resolution");

    group.throughput(Throughput::Bytes(HEADER.len() as u64));
    group.bench_function("aliased_header", |b| {
        b.iter(|| FeedSchema::from_header(black_box(HEADER), ','));
    });

    group.finish();
}

fn bench_line_splitting(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_splitting");

    group.throughput(Throughput::Bytes(LINE_PLAIN.len() as u64));
    group.bench_with_input(BenchmarkId::new("line", "plain"), &LINE_PLAIN, |b, line| {
        b.iter(|| split_delimited(black_box(line), ','));
    });

    group.throughput(Throughput::Bytes(LINE_QUOTED.len() as u64));
    group.bench_with_input(BenchmarkId::new("line", "quoted"), &LINE_QUOTED, |b, line| {
        b.iter(|| split_delimited(black_box(line), ','));
    });

    group.finish();
}

fn bench_whole_feed(c: &mut Criterion) {
    let mut group = c.benchmark_group("whole_feed");

    for rows in [100usize, 1_000, 10_000] {
        let feed = feed_text(rows);
        let config = FeedConfig::default();
        group.throughput(Throughput::Bytes(feed.len() as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &feed, |b, feed| {
            b.iter(|| skuforge::feed::parse_feed(black_box(feed), &config).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_header_resolution, bench_line_splitting, bench_whole_feed);
criterion_main!(benches);

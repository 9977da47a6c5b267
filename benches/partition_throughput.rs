//! Benchmarks for outcome partitioning
//!
//! Measures splitting a swept batch of stage outcomes into its success and
//! failure branches, at batch sizes and failure ratios the pipeline
//! actually sees.

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use skuforge_core::Product;
use skuforge_pipeline::{partition, FailureRecord, Outcome};

/// Build a batch where every `failure_every`-th outcome failed; zero means
/// a clean batch.
fn outcomes(total: usize, failure_every: usize) -> Vec<Outcome<Product>> {
    (0..total)
        .map(|i| {
            if failure_every != 0 && i % failure_every == 0 {
                Outcome::Failure(FailureRecord::new(
                    "parse",
                    format!("SKU-{i},,,"),
                    "missing product name",
                ))
            } else {
                let mut product = Product::new(format!("SKU-{i}"), "Denim Jacket");
                product.header.description =
                    "Classic blue denim with brass hardware and a quilted lining".to_string();
                product.header.brand = Some("Acme".to_string());
                Outcome::Success(product)
            }
        })
        .collect()
}

fn bench_partition_by_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition_size");

    for size in [100usize, 1_000, 10_000] {
        let input = outcomes(size, 10);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("mixed", size), &input, |b, input| {
            b.iter_batched(
                || input.clone(),
                |batch| partition(black_box(batch)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_partition_by_failure_ratio(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition_failure_ratio");

    for (label, failure_every) in [("clean", 0usize), ("one_in_ten", 10), ("all_failures", 1)] {
        let input = outcomes(1_000, failure_every);
        group.throughput(Throughput::Elements(1_000));
        group.bench_with_input(BenchmarkId::new("ratio", label), &input, |b, input| {
            b.iter_batched(
                || input.clone(),
                |batch| partition(black_box(batch)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_partition_by_size, bench_partition_by_failure_ratio);
criterion_main!(benches);

//! Random forest benchmarks
//!
//! - Forest fitting across worker counts
//! - Batch prediction
//! - Top-K feature ranking

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vital_forest::forest::{ForestParams, RandomForest, SplitCriterion};
use vital_forest::importance::rank_importances;

/// Synthetic matrix where feature 0 carries the label
#[allow(clippy::cast_precision_loss)]
fn dataset(rows: usize, features: usize) -> (Vec<Vec<f64>>, Vec<usize>) {
    let labels: Vec<usize> = (0..rows).map(|i| usize::from(i % 3 == 0)).collect();
    let matrix = labels
        .iter()
        .enumerate()
        .map(|(i, &label)| {
            (0..features)
                .map(|f| {
                    let noise = ((i * 13 + f * 7) % 97) as f64 / 97.0;
                    if f == 0 {
                        label as f64 + noise
                    } else {
                        noise
                    }
                })
                .collect()
        })
        .collect();
    (matrix, labels)
}

fn params(workers: usize) -> ForestParams {
    ForestParams {
        tree_count: 64,
        feature_fraction: 0.25,
        criterion: SplitCriterion::Entropy,
        worker_count: workers,
        seed: 0,
    }
}

/// Benchmark forest fitting
fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("forest_fit");
    group.sample_size(10);
    let (x, y) = dataset(300, 100);

    for workers in [1, 4, 8].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(workers), workers, |b, &w| {
            b.iter(|| {
                let forest = RandomForest::fit(&x, &y, &params(w)).unwrap();
                black_box(forest);
            });
        });
    }

    group.finish();
}

/// Benchmark batch prediction
fn bench_predict(c: &mut Criterion) {
    let (x, y) = dataset(300, 100);
    let forest = RandomForest::fit(&x, &y, &params(4)).unwrap();

    c.bench_function("forest_predict_batch", |b| {
        b.iter(|| black_box(forest.predict_batch(&x).unwrap()));
    });
}

/// Benchmark importance ranking
#[allow(clippy::cast_precision_loss)]
fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_importances");

    for features in [1_000, 20_000].iter() {
        let importances: Vec<f64> = (0..*features)
            .map(|i| ((i * 7919) % 10_007) as f64)
            .collect();
        let names: Vec<String> = (0..*features).map(|i| format!("G{i}")).collect();

        group.bench_with_input(BenchmarkId::from_parameter(features), features, |b, _| {
            b.iter(|| black_box(rank_importances(&importances, &names, 50).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit, bench_predict, bench_rank);
criterion_main!(benches);

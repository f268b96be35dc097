//! Filter latency benchmarks using Criterion

use criterion::measurement::WallTime;
use criterion::{BenchmarkGroup, BenchmarkId, Criterion, criterion_group, criterion_main};
use kalman_pairs::*;
use std::hint::black_box;

fn bench_filter_update(c: &mut Criterion) {
    let mut filter: HedgeRatioFilter = HedgeRatioFilter::new(FilterConfig::default()).unwrap();
    filter.update(45.0, 50.0).unwrap();

    c.bench_function("filter_update", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let a = 45.0 + (i % 100) as f64 * 0.01;
            black_box(filter.update(black_box(a), black_box(1.1 * a + 0.5)).unwrap());
            i += 1;
        });
    });
}

fn bench_pair_book(c: &mut Criterion) {
    let book: PairBook = PairBook::new(FilterConfig::default()).unwrap();
    for id in 0..64 {
        book.register(&format!("pair-{}", id)).unwrap();
    }

    c.bench_function("pair_book_update", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let a = 30.0 + (i % 50) as f64 * 0.02;
            black_box(book.update(black_box("pair-17"), a, 0.8 * a).unwrap());
            i += 1;
        });
    });
}

fn bench_signal(c: &mut Criterion) {
    let mut signal: SpreadSignal = SpreadSignal::new(SignalConfig::default()).unwrap();
    let outputs = [
        FilterOutput {
            forecast_error: -2.0,
            forecast_std_dev: 1.0,
            hedge_quantity: 1500.0,
        },
        FilterOutput {
            forecast_error: 0.5,
            forecast_std_dev: 1.0,
            hedge_quantity: 1500.0,
        },
    ];

    c.bench_function("signal_evaluate", |b| {
        let mut i = 0usize;
        b.iter(|| {
            black_box(signal.evaluate(black_box(&outputs[i % 2])));
            i += 1;
        });
    });
}

fn bench_throughput(c: &mut Criterion) {
    let mut group: BenchmarkGroup<WallTime> = c.benchmark_group("throughput");

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut filter = HedgeRatioFilter::new(FilterConfig::default()).unwrap();
                for i in 0..size {
                    let a = 45.0 + (i % 10) as f64 * 0.1;
                    black_box(filter.update(a, 1.5 * a).unwrap());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_filter_update,
    bench_pair_book,
    bench_signal,
    bench_throughput,
);

criterion_main!(benches);

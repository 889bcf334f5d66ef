//! Criterion benchmarks for the per-symbol hot path.
//!
//! 1. Heikin Ashi transform over series of increasing length
//! 2. Lenient transform (canonicalize + transform) on noisy input
//! 3. Reversal detection on a transformed series

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hascan_core::data::SyntheticProvider;
use hascan_core::heikin_ashi::{transform, transform_lenient};
use hascan_core::pattern::detect_reversal;
use hascan_core::{RawBar, RawSeries};

fn bars(days: i64) -> Vec<RawBar> {
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    let end = start + chrono::Duration::days(days);
    SyntheticProvider::new(42).generate("BENCH", start, end)
}

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");
    for days in [30_i64, 365, 3650] {
        let series = RawSeries::new(bars(days)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(days), &series, |b, s| {
            b.iter(|| transform(black_box(s)))
        });
    }
    group.finish();
}

fn bench_lenient(c: &mut Criterion) {
    let mut noisy = bars(365);
    for bar in noisy.iter_mut().step_by(17) {
        bar.high = f64::NAN;
    }
    c.bench_function("transform_lenient_365", |b| {
        b.iter(|| transform_lenient(black_box(noisy.clone()), 3))
    });
}

fn bench_detect(c: &mut Criterion) {
    let series = transform(&RawSeries::new(bars(365)).unwrap());
    c.bench_function("detect_reversal", |b| b.iter(|| detect_reversal(black_box(&series))));
}

criterion_group!(benches, bench_transform, bench_lenient, bench_detect);
criterion_main!(benches);

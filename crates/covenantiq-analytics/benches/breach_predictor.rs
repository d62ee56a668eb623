//! Benchmarks for the breach predictor and trend aggregator.
//!
//! Run with: cargo bench -p covenantiq-analytics

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use covenantiq_analytics::{BreachPredictor, Observation, Period, TrendAggregator};
use covenantiq_core::{Date, ThresholdOperator};

// =============================================================================
// TEST DATA GENERATORS
// =============================================================================

fn quarterly_history(samples: usize) -> Vec<Observation> {
    let start = Date::from_ymd(2020, 1, 1).unwrap();
    (0..samples)
        .map(|i| {
            let drift = 0.05 * i as f64;
            let wobble = if i % 2 == 0 { 0.02 } else { -0.02 };
            Observation::new(start.add_days(91 * i as i64), 2.0 + drift + wobble)
        })
        .collect()
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_predict(c: &mut Criterion) {
    let predictor = BreachPredictor::default();
    let mut group = c.benchmark_group("breach_predictor");

    for samples in [3usize, 12, 48, 240] {
        let history = quarterly_history(samples);
        group.throughput(Throughput::Elements(samples as u64));
        group.bench_with_input(BenchmarkId::new("predict", samples), &history, |b, h| {
            b.iter(|| {
                predictor.predict(
                    black_box(h),
                    Some(4.5),
                    Some(ThresholdOperator::LessOrEqual),
                )
            });
        });
    }
    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let aggregator = TrendAggregator::new();
    let history = quarterly_history(48);
    let current = Period::trailing_months(Date::from_ymd(2031, 12, 31).unwrap(), 12).unwrap();
    let previous = current.preceding().unwrap();

    c.bench_function("trend_aggregate_12m", |b| {
        b.iter(|| aggregator.aggregate(black_box(&history), &current, &previous));
    });
}

criterion_group!(benches, bench_predict, bench_aggregate);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use varimp::estimator::{estimate_one_fold, EstimatorConfig};
use varimp::measures::{measure_callables, Measure};

pub fn estimation_benchmarks(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let n = 10_000;
    let y: Vec<f64> = (0..n)
        .map(|_| if rng.gen::<f64>() < 0.5 { 1.0 } else { 0.0 })
        .collect();
    let full: Vec<f64> = y.iter().map(|y_| 0.2 + 0.6 * y_ + 0.1 * rng.gen::<f64>()).collect();
    let reduced: Vec<f64> = (0..n).map(|_| 0.45 + 0.1 * rng.gen::<f64>()).collect();
    let weights = vec![1.0; n];

    let (rsquared, _) = measure_callables(&Measure::RSquared);
    c.bench_function("rsquared predictiveness", |b| {
        b.iter(|| rsquared(black_box(&y), black_box(&full), black_box(&weights)))
    });

    let (auc, _) = measure_callables(&Measure::Auc);
    c.bench_function("auc predictiveness", |b| {
        b.iter(|| auc(black_box(&y), black_box(&full), black_box(&weights)))
    });

    let cfg = EstimatorConfig::default();
    c.bench_function("one-fold estimate", |b| {
        b.iter(|| {
            estimate_one_fold(
                black_box(&y),
                black_box(&full),
                black_box(&reduced),
                None,
                &[1],
                Measure::RSquared,
                None,
                &cfg,
            )
        })
    });
}

criterion_group!(benches, estimation_benchmarks);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glmfold::loss::LogisticLoss;
use glmfold::normalization::{EffectiveCoefficients, NormalizationContext};
use glmfold::reduce::{hessian_vector_product, value_and_gradient};
use glmfold::{Features, LabeledPoint, LossAggregator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn dense_points(rng: &mut StdRng, n: usize, dim: usize) -> Vec<LabeledPoint> {
    (0..n)
        .map(|_| {
            let features: Vec<f64> = (0..dim).map(|_| rng.gen_range(-2.0..2.0)).collect();
            LabeledPoint::new(
                if rng.gen_bool(0.5) { 1.0 } else { 0.0 },
                Features::dense(features),
            )
        })
        .collect()
}

fn sparse_points(rng: &mut StdRng, n: usize, dim: usize, nnz: usize) -> Vec<LabeledPoint> {
    (0..n)
        .map(|_| {
            let mut indices: Vec<usize> = Vec::with_capacity(nnz);
            let mut index = rng.gen_range(0..dim / nnz);
            while indices.len() < nnz {
                indices.push(index);
                index += rng.gen_range(1..=dim / nnz);
                if index >= dim {
                    break;
                }
            }
            let values: Vec<f64> = indices.iter().map(|_| rng.gen_range(-2.0..2.0)).collect();
            LabeledPoint::new(
                if rng.gen_bool(0.5) { 1.0 } else { 0.0 },
                Features::sparse(dim, indices, values).unwrap(),
            )
        })
        .collect()
}

pub fn aggregation_benchmarks(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let dim = 64;
    let n = 100_000;

    let dense = dense_points(&mut rng, n, dim);
    let sparse = sparse_points(&mut rng, n, dim, 8);
    let coefficients: Vec<f64> = (0..dim).map(|_| rng.gen_range(-0.5..0.5)).collect();
    let multiply: Vec<f64> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let means: Vec<f64> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let stds: Vec<f64> = (0..dim).map(|_| rng.gen_range(0.5..2.0)).collect();
    let context = NormalizationContext::standardization(&means, &stds, None).unwrap();
    let identity = NormalizationContext::identity();
    let loss = LogisticLoss::default();

    c.bench_function("Fold Dense Gradient", |b| {
        let effective = EffectiveCoefficients::new(&coefficients, &identity).unwrap();
        b.iter(|| {
            let mut aggregator = LossAggregator::gradient(&loss, &effective, &identity);
            for point in black_box(&dense) {
                aggregator.add(point).unwrap();
            }
            aggregator.vector()
        })
    });

    c.bench_function("Fold Sparse Gradient", |b| {
        let effective = EffectiveCoefficients::new(&coefficients, &context).unwrap();
        b.iter(|| {
            let mut aggregator = LossAggregator::gradient(&loss, &effective, &context);
            for point in black_box(&sparse) {
                aggregator.add(point).unwrap();
            }
            aggregator.vector()
        })
    });

    c.bench_function("Parallel Value And Gradient", |b| {
        b.iter(|| {
            value_and_gradient(
                &loss,
                black_box(&coefficients),
                black_box(&context),
                black_box(&dense),
            )
            .unwrap()
        })
    });

    c.bench_function("Parallel Hessian-Vector Product", |b| {
        b.iter(|| {
            hessian_vector_product(
                &loss,
                black_box(&coefficients),
                black_box(&multiply),
                black_box(&context),
                black_box(&dense),
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, aggregation_benchmarks);
criterion_main!(benches);

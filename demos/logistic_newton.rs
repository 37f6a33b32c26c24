//! Example: Fitting a logistic model with Newton-CG on top of the aggregators
//! ---------------------------------------------------------------------------
//! This example shows the two reductions working together inside an
//! optimizer: `value_and_gradient` drives the Newton steps and
//! `hessian_vector_product` powers a matrix-free conjugate-gradient solve of
//! each Newton system, with feature standardization folded in through the
//! normalization context instead of rewriting the data.
//!
//! ```bash
//! # From the crate root of *glmfold*
//! cargo run --example logistic_newton
//! ```
use std::error::Error;

use glmfold::loss::Loss;
use glmfold::normalization::{EffectiveCoefficients, NormalizationContext};
use glmfold::reduce::{hessian_vector_product, value_and_gradient};
use glmfold::{Features, GlmFoldError, LabeledPoint};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Matrix-free conjugate gradient: solves `H p = rhs` given only `v -> H v`.
fn conjugate_gradient<F>(apply: F, rhs: &[f64]) -> Result<Vec<f64>, GlmFoldError>
where
    F: Fn(&[f64]) -> Result<Vec<f64>, GlmFoldError>,
{
    let mut solution = vec![0.0; rhs.len()];
    let mut residual = rhs.to_vec();
    let mut direction = residual.clone();
    let mut residual_norm2 = dot(&residual, &residual);
    for _ in 0..2 * rhs.len() {
        if residual_norm2.sqrt() < 1e-12 {
            break;
        }
        let applied = apply(&direction)?;
        let step = residual_norm2 / dot(&direction, &applied);
        for j in 0..solution.len() {
            solution[j] += step * direction[j];
            residual[j] -= step * applied[j];
        }
        let next_norm2 = dot(&residual, &residual);
        let momentum = next_norm2 / residual_norm2;
        for j in 0..direction.len() {
            direction[j] = residual[j] + momentum * direction[j];
        }
        residual_norm2 = next_norm2;
    }
    Ok(solution)
}

fn main() -> Result<(), Box<dyn Error>> {
    //----------------------//
    // 1. Build dataset     //
    //----------------------//

    // Four informative features on wildly different raw scales, plus an
    // intercept column of ones. Labels are Bernoulli draws from the true
    // standardized-scale weights.
    let mut rng = StdRng::seed_from_u64(1);
    let n = 5_000;
    let dim = 5;
    let true_weights = [1.5, -2.0, 0.8, 1.2, -0.5];
    let means = [5.0, -3.0, 100.0, 0.0];
    let stds = [2.0, 0.5, 30.0, 1.0];
    let half_width = 3.0_f64.sqrt();

    let mut points = Vec::with_capacity(n);
    for _ in 0..n {
        let standardized: Vec<f64> =
            (0..4).map(|_| rng.gen_range(-half_width..half_width)).collect();
        let margin = dot(&standardized, &true_weights[..4]) + true_weights[4];
        let probability = 1.0 / (1.0 + (-margin).exp());
        let label = if rng.gen_bool(probability) { 1.0 } else { 0.0 };
        let mut raw: Vec<f64> = standardized
            .iter()
            .zip(&stds)
            .zip(&means)
            .map(|((z, s), m)| z * s + m)
            .collect();
        raw.push(1.0);
        points.push(LabeledPoint::new(label, Features::dense(raw)));
    }

    //------------------------------//
    // 2. Standardization context   //
    //------------------------------//

    let mut sample_means = vec![0.0; dim];
    for point in &points {
        for (m, x) in sample_means.iter_mut().zip(point.features.to_dense()) {
            *m += x;
        }
    }
    for m in sample_means.iter_mut() {
        *m /= n as f64;
    }
    let mut sample_vars = vec![0.0; dim];
    for point in &points {
        for (v, (x, m)) in sample_vars
            .iter_mut()
            .zip(point.features.to_dense().iter().zip(&sample_means))
        {
            *v += (x - m) * (x - m);
        }
    }
    let sample_stds: Vec<f64> = sample_vars.iter().map(|v| (v / n as f64).sqrt()).collect();
    let context = NormalizationContext::standardization(&sample_means, &sample_stds, Some(4))?;

    //----------------------//
    // 3. Newton-CG fit     //
    //----------------------//

    let loss = Loss::Logistic;
    let damping = 1e-6;
    let mut coefficients = vec![0.0; dim];
    for iteration in 0..25 {
        let (value, gradient) = value_and_gradient(&loss, &coefficients, &context, &points)?;
        let gradient_norm = dot(&gradient, &gradient).sqrt();
        println!(
            "iter {iteration:2}  objective {:.6}  |gradient| {:.3e}",
            value / n as f64,
            gradient_norm
        );
        if gradient_norm < 1e-6 {
            break;
        }
        let newton_step = conjugate_gradient(
            |v: &[f64]| {
                let mut applied =
                    hessian_vector_product(&loss, &coefficients, v, &context, &points)?;
                for (h, x) in applied.iter_mut().zip(v) {
                    *h += damping * x;
                }
                Ok(applied)
            },
            &gradient,
        )?;
        for (c, s) in coefficients.iter_mut().zip(&newton_step) {
            *c -= s;
        }
    }

    //----------------------//
    // 4. Report            //
    //----------------------//

    let effective = EffectiveCoefficients::new(&coefficients, &context)?;
    let correct = points
        .iter()
        .filter(|point| {
            let predicted = if effective.margin(point) > 0.0 { 1.0 } else { 0.0 };
            predicted == point.label
        })
        .count();
    println!("Fitted weights (standardized scale): {coefficients:.3?}");
    println!("Generating weights:                  {true_weights:.3?}");
    println!("Training accuracy: {:.3}", correct as f64 / n as f64);

    Ok(())
}

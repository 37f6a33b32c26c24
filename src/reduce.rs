//! Reduction
//!
//! Data-parallel folding of a slice of points: one aggregator per shard,
//! merged associatively on the rayon pool.
use crate::aggregator::LossAggregator;
use crate::data::LabeledPoint;
use crate::errors::GlmFoldError;
use crate::loss::PointwiseLoss;
use crate::normalization::{EffectiveCoefficients, NormalizationContext};
use log::debug;
use rayon::prelude::*;

/// Smallest shard worth its own fold; below this the split overhead wins.
const MIN_SHARD_POINTS: usize = 1024;

fn shard_size(len: usize) -> usize {
    let threads = rayon::current_num_threads().max(1);
    len.div_ceil(threads).max(MIN_SHARD_POINTS)
}

fn fold<'a, L, F>(points: &[LabeledPoint], make: F) -> Result<LossAggregator<'a, L>, GlmFoldError>
where
    L: PointwiseLoss + ?Sized,
    F: Fn() -> Result<LossAggregator<'a, L>, GlmFoldError> + Send + Sync,
{
    let size = shard_size(points.len().max(1));
    debug!(
        "folding {} points into {} shards of up to {} points",
        points.len(),
        points.len().div_ceil(size),
        size
    );
    points
        .par_chunks(size)
        .map(|shard| {
            let mut aggregator = make()?;
            for point in shard {
                aggregator.add(point)?;
            }
            Ok(aggregator)
        })
        .try_reduce_with(|mut left, right| {
            left.merge(right)?;
            Ok(left)
        })
        .unwrap_or_else(|| make())
}

/// Objective value and gradient of the loss over `points`, with
/// normalization folded into the coefficients.
///
/// Shards the slice across the rayon pool, folds one aggregator per shard
/// and merges the results. Any aggregation error aborts the whole
/// reduction. An empty slice yields value 0 and a zero gradient.
pub fn value_and_gradient<L>(
    loss: &L,
    coefficients: &[f64],
    normalization: &NormalizationContext,
    points: &[LabeledPoint],
) -> Result<(f64, Vec<f64>), GlmFoldError>
where
    L: PointwiseLoss + ?Sized,
{
    let effective = EffectiveCoefficients::new(coefficients, normalization)?;
    let aggregator = fold(points, || {
        Ok(LossAggregator::gradient(loss, &effective, normalization))
    })?;
    Ok((aggregator.value(), aggregator.vector()))
}

/// Hessian-vector product of the loss over `points`: the Hessian at
/// `coefficients` applied to `multiply`, with normalization folded in.
pub fn hessian_vector_product<L>(
    loss: &L,
    coefficients: &[f64],
    multiply: &[f64],
    normalization: &NormalizationContext,
    points: &[LabeledPoint],
) -> Result<Vec<f64>, GlmFoldError>
where
    L: PointwiseLoss + ?Sized,
{
    let effective = EffectiveCoefficients::new(coefficients, normalization)?;
    let effective_multiply = EffectiveCoefficients::new(multiply, normalization)?;
    let aggregator = fold(points, || {
        LossAggregator::hessian_vector(loss, &effective, &effective_multiply, normalization)
    })?;
    Ok(aggregator.vector())
}

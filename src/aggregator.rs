//! Aggregator
//!
//! The mergeable accumulator at the heart of distributed GLM fitting: folds
//! labeled points into an objective value plus either a gradient or a
//! Hessian-vector product, with normalization applied algebraically instead
//! of by rewriting feature vectors.
use crate::data::LabeledPoint;
use crate::errors::GlmFoldError;
use crate::loss::PointwiseLoss;
use crate::normalization::{EffectiveCoefficients, NormalizationContext};

/// Which derivative quantity an aggregator accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorKind {
    /// Objective value and gradient.
    Gradient,
    /// Hessian-vector product. The value sum stays zero.
    HessianVector,
}

/// Per-kind inputs fixed at construction.
#[derive(Clone, Copy)]
enum Mode<'a> {
    Gradient,
    HessianVector { multiply: &'a EffectiveCoefficients },
}

impl Mode<'_> {
    fn kind(&self) -> AggregatorKind {
        match self {
            Mode::Gradient => AggregatorKind::Gradient,
            Mode::HessianVector { .. } => AggregatorKind::HessianVector,
        }
    }
}

/// Streaming accumulator over one shard of labeled points.
///
/// The shared inputs, loss and coefficients and normalization, are immutable
/// borrows, so any number of shard aggregators can read them concurrently.
/// The running sums are owned exclusively by each instance: `add` folds one
/// point into one shard, `merge` combines two finished shards. Merging is
/// associative and commutative up to floating-point rounding, which is what
/// makes the reduction order a scheduling detail.
///
/// Per point the aggregator computes the margin and a single `scale`, the
/// weighted slope for gradients or the weighted curvature times the multiply
/// product for Hessian-vector products, and accumulates `scale * x` over raw
/// features. `vector` reconstructs the normalized result at extraction time.
pub struct LossAggregator<'a, L: ?Sized> {
    loss: &'a L,
    coefficients: &'a EffectiveCoefficients,
    normalization: &'a NormalizationContext,
    mode: Mode<'a>,
    count: usize,
    value_sum: f64,
    vector_sum: Vec<f64>,
    prefactor_sum: f64,
}

impl<'a, L> LossAggregator<'a, L>
where
    L: PointwiseLoss + ?Sized,
{
    /// Create a gradient aggregator.
    pub fn gradient(
        loss: &'a L,
        coefficients: &'a EffectiveCoefficients,
        normalization: &'a NormalizationContext,
    ) -> Self {
        Self::with_mode(loss, coefficients, normalization, Mode::Gradient)
    }

    /// Create a Hessian-vector aggregator applying the Hessian to the vector
    /// behind `multiply`.
    ///
    /// `multiply` is the same affine decomposition applied to the multiply
    /// vector; its dimension must match the coefficients.
    pub fn hessian_vector(
        loss: &'a L,
        coefficients: &'a EffectiveCoefficients,
        multiply: &'a EffectiveCoefficients,
        normalization: &'a NormalizationContext,
    ) -> Result<Self, GlmFoldError> {
        if multiply.dim() != coefficients.dim() {
            return Err(GlmFoldError::DimensionMismatch(
                "multiply vector".to_string(),
                coefficients.dim(),
                multiply.dim(),
            ));
        }
        Ok(Self::with_mode(
            loss,
            coefficients,
            normalization,
            Mode::HessianVector { multiply },
        ))
    }

    fn with_mode(
        loss: &'a L,
        coefficients: &'a EffectiveCoefficients,
        normalization: &'a NormalizationContext,
        mode: Mode<'a>,
    ) -> Self {
        LossAggregator {
            loss,
            coefficients,
            normalization,
            mode,
            count: 0,
            value_sum: 0.0,
            vector_sum: vec![0.0; coefficients.dim()],
            prefactor_sum: 0.0,
        }
    }

    /// Fold one labeled point into the running sums.
    ///
    /// Returns `self` so calls can be chained. Fails if the point's feature
    /// dimension disagrees with the model.
    pub fn add(&mut self, point: &LabeledPoint) -> Result<&mut Self, GlmFoldError> {
        if point.features.len() != self.dim() {
            return Err(GlmFoldError::DimensionMismatch(
                "labeled point features".to_string(),
                self.dim(),
                point.features.len(),
            ));
        }
        let margin = self.coefficients.margin(point);
        let scale = match self.mode {
            Mode::Gradient => {
                let (value, slope) = self.loss.evaluate(margin, point.label);
                self.value_sum += point.weight * value;
                point.weight * slope
            }
            Mode::HessianVector { multiply } => {
                // The offset moves the margin the loss is evaluated at, not
                // the direction the Hessian is applied to, so it stays out
                // of the multiply product.
                let curvature = self.loss.second_derivative(margin, point.label);
                let product = point.features.dot(multiply.values()) + multiply.margin_shift();
                point.weight * curvature * product
            }
        };
        if self.normalization.shifts().is_some() {
            self.prefactor_sum += scale;
        }
        point.features.add_scaled(scale, &mut self.vector_sum);
        self.count += 1;
        Ok(self)
    }

    /// Fold another shard's aggregator into this one.
    ///
    /// Fails if dimensions or kinds disagree. Merging an empty aggregator is
    /// a no-op.
    pub fn merge(&mut self, other: Self) -> Result<&mut Self, GlmFoldError> {
        if other.dim() != self.dim() {
            return Err(GlmFoldError::DimensionMismatch(
                "merged aggregator".to_string(),
                self.dim(),
                other.dim(),
            ));
        }
        if other.kind() != self.kind() {
            return Err(GlmFoldError::KindMismatch(self.kind(), other.kind()));
        }
        if other.count == 0 {
            return Ok(self);
        }
        self.count += other.count;
        self.value_sum += other.value_sum;
        self.prefactor_sum += other.prefactor_sum;
        for (acc, x) in self.vector_sum.iter_mut().zip(&other.vector_sum) {
            *acc += x;
        }
        Ok(self)
    }

    /// Number of points folded in, across all merged shards.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Weighted objective value. Stays 0 for the Hessian-vector kind, which
    /// never accumulates it.
    pub fn value(&self) -> f64 {
        self.value_sum
    }

    /// Model dimension.
    pub fn dim(&self) -> usize {
        self.vector_sum.len()
    }

    /// Which derivative quantity this aggregator accumulates.
    pub fn kind(&self) -> AggregatorKind {
        self.mode.kind()
    }

    /// The gradient, or Hessian-vector product, over normalized features,
    /// reconstructed from the raw-feature sums.
    ///
    /// Per coordinate the accumulated `Σ scale · x[j]` is corrected by the
    /// shift term `shifts[j] * Σ scale` and rescaled by `factors[j]`, which
    /// equals accumulating over explicitly transformed features.
    pub fn vector(&self) -> Vec<f64> {
        match (self.normalization.factors(), self.normalization.shifts()) {
            (Some(factors), Some(shifts)) => self
                .vector_sum
                .iter()
                .zip(factors)
                .zip(shifts)
                .map(|((sum, factor), shift)| (sum - shift * self.prefactor_sum) * factor)
                .collect(),
            (Some(factors), None) => self
                .vector_sum
                .iter()
                .zip(factors)
                .map(|(sum, factor)| sum * factor)
                .collect(),
            (None, Some(shifts)) => self
                .vector_sum
                .iter()
                .zip(shifts)
                .map(|(sum, shift)| sum - shift * self.prefactor_sum)
                .collect(),
            (None, None) => self.vector_sum.clone(),
        }
    }
}

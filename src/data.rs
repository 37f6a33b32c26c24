//! Labeled data
//!
//! Feature vectors, stored dense or sparse, and the labeled observations
//! that get folded into the aggregators.
use crate::errors::GlmFoldError;
use serde::{Deserialize, Serialize};

/// A feature vector of fixed dimension.
///
/// Sparse vectors keep `(index, value)` pairs with strictly increasing
/// indices, so dot products and scaled accumulation only ever touch the
/// stored entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Features {
    /// Every coordinate stored explicitly.
    Dense(Vec<f64>),
    /// Only the stored coordinates are non-zero.
    Sparse {
        /// Dimension of the vector.
        dim: usize,
        /// Indices of the stored entries, strictly increasing.
        indices: Vec<usize>,
        /// One value per stored index.
        values: Vec<f64>,
    },
}

impl Features {
    /// Create a dense feature vector.
    pub fn dense(values: Vec<f64>) -> Self {
        Features::Dense(values)
    }

    /// Create a sparse feature vector of dimension `dim`.
    ///
    /// The indices must be strictly increasing, within bounds, and paired
    /// one-to-one with the values.
    pub fn sparse(dim: usize, indices: Vec<usize>, values: Vec<f64>) -> Result<Self, GlmFoldError> {
        if indices.len() != values.len() {
            return Err(GlmFoldError::InvalidFeatures(format!(
                "{} indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        for (pos, &index) in indices.iter().enumerate() {
            if index >= dim {
                return Err(GlmFoldError::InvalidFeatures(format!(
                    "index {} out of bounds for dimension {}",
                    index, dim
                )));
            }
            if pos > 0 && indices[pos - 1] >= index {
                return Err(GlmFoldError::InvalidFeatures(format!(
                    "indices must be strictly increasing, found {} after {}",
                    index,
                    indices[pos - 1]
                )));
            }
        }
        Ok(Features::Sparse { dim, indices, values })
    }

    /// Dimension of the vector.
    pub fn len(&self) -> usize {
        match self {
            Features::Dense(values) => values.len(),
            Features::Sparse { dim, .. } => *dim,
        }
    }

    /// Whether the dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dot product against a dense slice of the same dimension.
    #[inline]
    pub fn dot(&self, other: &[f64]) -> f64 {
        debug_assert_eq!(self.len(), other.len());
        match self {
            Features::Dense(values) => values.iter().zip(other).map(|(x, c)| x * c).sum(),
            Features::Sparse { indices, values, .. } => {
                indices.iter().zip(values).map(|(i, x)| x * other[*i]).sum()
            }
        }
    }

    /// Add `scale * self` into `acc`, touching only stored entries.
    #[inline]
    pub fn add_scaled(&self, scale: f64, acc: &mut [f64]) {
        debug_assert_eq!(self.len(), acc.len());
        match self {
            Features::Dense(values) => {
                for (a, x) in acc.iter_mut().zip(values) {
                    *a += scale * x;
                }
            }
            Features::Sparse { indices, values, .. } => {
                for (i, x) in indices.iter().zip(values) {
                    acc[*i] += scale * x;
                }
            }
        }
    }

    /// Materialize as a dense vector.
    pub fn to_dense(&self) -> Vec<f64> {
        match self {
            Features::Dense(values) => values.clone(),
            Features::Sparse { dim, indices, values } => {
                let mut dense = vec![0.0; *dim];
                for (i, x) in indices.iter().zip(values) {
                    dense[*i] = *x;
                }
                dense
            }
        }
    }
}

/// A single observation: label, features, margin offset and sample weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledPoint {
    /// Target value. What it means depends on the loss, e.g. 0 or 1 for
    /// logistic loss, a count for Poisson loss.
    pub label: f64,
    /// Feature vector.
    pub features: Features,
    /// Fixed addition to the margin, e.g. a log exposure term.
    pub offset: f64,
    /// Sample weight.
    pub weight: f64,
}

impl LabeledPoint {
    /// Create a point with offset 0 and weight 1.
    pub fn new(label: f64, features: Features) -> Self {
        LabeledPoint {
            label,
            features,
            offset: 0.0,
            weight: 1.0,
        }
    }

    /// Create a weighted point with offset 0.
    pub fn weighted(label: f64, features: Features, weight: f64) -> Self {
        LabeledPoint {
            label,
            features,
            offset: 0.0,
            weight,
        }
    }

    /// Margin of this point under the given coefficients:
    /// `offset + features · coefficients`.
    #[inline]
    pub fn margin(&self, coefficients: &[f64]) -> f64 {
        self.offset + self.features.dot(coefficients)
    }
}

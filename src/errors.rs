//! Errors
//!
//! Custom error types used throughout the `glmfold` crate.
use crate::aggregator::AggregatorKind;
use thiserror::Error;

/// Errors that can occur while building or folding loss aggregators.
#[derive(Debug, Error)]
pub enum GlmFoldError {
    /// Normalization parameters cannot be applied to the model.
    #[error("Invalid normalization parameters: {0}.")]
    InvalidNormalization(String),
    /// A vector or aggregator disagrees with the model dimension.
    #[error("Dimension mismatch in {0}: expected {1}, found {2}.")]
    DimensionMismatch(String, usize, usize),
    /// Gradient and Hessian-vector aggregators are never merged together.
    #[error("Cannot merge a {1:?} aggregator into a {0:?} aggregator.")]
    KindMismatch(AggregatorKind, AggregatorKind),
    /// A sparse feature vector is structurally malformed.
    #[error("Invalid sparse features: {0}.")]
    InvalidFeatures(String),
}

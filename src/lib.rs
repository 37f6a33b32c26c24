// Modules
pub mod aggregator;
pub mod data;
pub mod errors;
pub mod loss;
pub mod normalization;
pub mod reduce;

// Individual classes, and functions
pub use aggregator::{AggregatorKind, LossAggregator};
pub use data::{Features, LabeledPoint};
pub use errors::GlmFoldError;
pub use normalization::{EffectiveCoefficients, NormalizationContext};

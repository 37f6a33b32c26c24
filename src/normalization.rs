//! Normalization
//!
//! Per-feature centering and scaling folded into the model coefficients, so
//! feature vectors are never transformed explicitly and sparse data stays
//! sparse.
use crate::data::LabeledPoint;
use crate::errors::GlmFoldError;
use serde::{Deserialize, Serialize};

/// Optional per-feature scale factors and shifts, with an optional
/// untransformed intercept feature.
///
/// The transformed value of coordinate `j` is
/// `(x[j] - shifts[j]) * factors[j]`; a missing vector means no shift or no
/// scaling. The intercept feature, if any, must stay untransformed: factor
/// exactly 1 and shift exactly 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizationContext {
    factors: Option<Vec<f64>>,
    shifts: Option<Vec<f64>>,
    intercept: Option<usize>,
}

impl NormalizationContext {
    /// The context that leaves features untouched.
    pub fn identity() -> Self {
        NormalizationContext::default()
    }

    /// Create a context from explicit factors and shifts.
    pub fn new(
        factors: Option<Vec<f64>>,
        shifts: Option<Vec<f64>>,
        intercept: Option<usize>,
    ) -> Result<Self, GlmFoldError> {
        let context = NormalizationContext {
            factors,
            shifts,
            intercept,
        };
        if let (Some(factors), Some(shifts)) = (&context.factors, &context.shifts) {
            if factors.len() != shifts.len() {
                return Err(GlmFoldError::InvalidNormalization(format!(
                    "factors have length {} but shifts have length {}",
                    factors.len(),
                    shifts.len()
                )));
            }
        }
        context.check_intercept()?;
        Ok(context)
    }

    /// Build a standardization context from per-feature means and standard
    /// deviations: shift by the mean, scale by the inverse standard
    /// deviation.
    ///
    /// The intercept slot, if given, is forced to factor 1 and shift 0. A
    /// zero standard deviation leaves that feature unscaled.
    pub fn standardization(
        means: &[f64],
        stds: &[f64],
        intercept: Option<usize>,
    ) -> Result<Self, GlmFoldError> {
        if means.len() != stds.len() {
            return Err(GlmFoldError::InvalidNormalization(format!(
                "means have length {} but standard deviations have length {}",
                means.len(),
                stds.len()
            )));
        }
        let mut factors = Vec::with_capacity(stds.len());
        let mut shifts = Vec::with_capacity(means.len());
        for (j, (&mean, &std)) in means.iter().zip(stds).enumerate() {
            if !mean.is_finite() || !std.is_finite() || std < 0.0 {
                return Err(GlmFoldError::InvalidNormalization(format!(
                    "non-finite or negative statistics for feature {}",
                    j
                )));
            }
            if Some(j) == intercept {
                factors.push(1.0);
                shifts.push(0.0);
            } else {
                factors.push(if std > 0.0 { 1.0 / std } else { 1.0 });
                shifts.push(mean);
            }
        }
        NormalizationContext::new(Some(factors), Some(shifts), intercept)
    }

    /// Per-feature multiplicative factors, if any.
    pub fn factors(&self) -> Option<&[f64]> {
        self.factors.as_deref()
    }

    /// Per-feature additive shifts, if any.
    pub fn shifts(&self) -> Option<&[f64]> {
        self.shifts.as_deref()
    }

    /// Index of the untransformed intercept feature, if any.
    pub fn intercept(&self) -> Option<usize> {
        self.intercept
    }

    /// Whether this context transforms nothing.
    pub fn is_identity(&self) -> bool {
        self.factors.is_none() && self.shifts.is_none()
    }

    /// Check this context against the model dimension.
    pub fn validate(&self, dim: usize) -> Result<(), GlmFoldError> {
        if let Some(factors) = &self.factors {
            if factors.len() != dim {
                return Err(GlmFoldError::InvalidNormalization(format!(
                    "factors have length {} but the model has dimension {}",
                    factors.len(),
                    dim
                )));
            }
        }
        if let Some(shifts) = &self.shifts {
            if shifts.len() != dim {
                return Err(GlmFoldError::InvalidNormalization(format!(
                    "shifts have length {} but the model has dimension {}",
                    shifts.len(),
                    dim
                )));
            }
        }
        if let Some(index) = self.intercept {
            if index >= dim {
                return Err(GlmFoldError::InvalidNormalization(format!(
                    "intercept index {} out of bounds for dimension {}",
                    index, dim
                )));
            }
        }
        Ok(())
    }

    fn check_intercept(&self) -> Result<(), GlmFoldError> {
        let Some(index) = self.intercept else {
            return Ok(());
        };
        if let Some(factors) = &self.factors {
            if index >= factors.len() {
                return Err(GlmFoldError::InvalidNormalization(format!(
                    "intercept index {} out of bounds for {} factors",
                    index,
                    factors.len()
                )));
            }
            if factors[index] != 1.0 {
                return Err(GlmFoldError::InvalidNormalization(format!(
                    "intercept feature {} must keep factor 1, found {}",
                    index, factors[index]
                )));
            }
        }
        if let Some(shifts) = &self.shifts {
            if index >= shifts.len() {
                return Err(GlmFoldError::InvalidNormalization(format!(
                    "intercept index {} out of bounds for {} shifts",
                    index,
                    shifts.len()
                )));
            }
            if shifts[index] != 0.0 {
                return Err(GlmFoldError::InvalidNormalization(format!(
                    "intercept feature {} must keep shift 0, found {}",
                    index, shifts[index]
                )));
            }
        }
        Ok(())
    }
}

/// Model coefficients with normalization folded in, computed once per
/// coefficient update rather than once per point.
///
/// For any feature vector `x`,
/// `values · x + margin_shift == coefficients · ((x - shifts) ⊙ factors)`,
/// so margins under normalized features come from a single dot product
/// against the raw, possibly sparse `x`.
#[derive(Debug, Clone)]
pub struct EffectiveCoefficients {
    values: Vec<f64>,
    margin_shift: f64,
}

impl EffectiveCoefficients {
    /// Fold a normalization context into raw coefficients.
    ///
    /// Fails before any data is touched if the context cannot apply to a
    /// model of this dimension.
    pub fn new(
        coefficients: &[f64],
        normalization: &NormalizationContext,
    ) -> Result<Self, GlmFoldError> {
        normalization.validate(coefficients.len())?;
        let values: Vec<f64> = match normalization.factors() {
            Some(factors) => coefficients.iter().zip(factors).map(|(c, f)| c * f).collect(),
            None => coefficients.to_vec(),
        };
        let margin_shift = match normalization.shifts() {
            Some(shifts) => -values.iter().zip(shifts).map(|(v, s)| v * s).sum::<f64>(),
            None => 0.0,
        };
        Ok(EffectiveCoefficients { values, margin_shift })
    }

    /// The normalization-adjusted coefficients.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Constant margin contribution induced by the shifts.
    pub fn margin_shift(&self) -> f64 {
        self.margin_shift
    }

    /// Model dimension.
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Normalized margin of a point:
    /// `offset + features · values + margin_shift`.
    #[inline]
    pub fn margin(&self, point: &LabeledPoint) -> f64 {
        point.margin(&self.values) + self.margin_shift
    }
}

//! Loss functions
//!
//! Pointwise losses for generalized linear models. Each loss is a pure
//! function of the margin (the linear predictor) and the label, and reports
//! the derivatives the aggregators need.
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The contract aggregation requires of a loss function.
///
/// Implementations must be pure: no side effects, and the same output for
/// the same `(margin, label)` pair.
pub trait PointwiseLoss: Send + Sync {
    /// Loss value and its first derivative with respect to the margin.
    fn evaluate(&self, margin: f64, label: f64) -> (f64, f64);

    /// Second derivative of the loss with respect to the margin.
    ///
    /// Only consulted by Hessian-vector aggregation.
    fn second_derivative(&self, margin: f64, label: f64) -> f64;
}

/// The loss to aggregate.
#[derive(Serialize, Deserialize, Clone)]
pub enum Loss {
    /// Binary logistic loss. Labels should be 0 or 1.
    Logistic,
    /// One-half squared error for regression.
    Squared,
    /// Poisson regression loss with a log link. Labels should be counts.
    Poisson,
    /// Smoothed hinge loss for classification. Labels should be 0 or 1.
    SmoothedHinge,
    /// Custom user-defined loss.
    #[serde(with = "loss_custom_serde")]
    Custom(Arc<dyn PointwiseLoss>),
}

mod loss_custom_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(_: &Arc<dyn PointwiseLoss>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str("Custom")
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Arc<dyn PointwiseLoss>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let _: String = Deserialize::deserialize(d)?;
        Ok(Arc::new(SquaredLoss::default()))
    }
}

impl Loss {
    /// Wrap a user-defined loss.
    pub fn new_custom<T>(loss: T) -> Self
    where
        T: PointwiseLoss + 'static,
    {
        Loss::Custom(Arc::new(loss))
    }
}

/// Dispatch a method call through the `Loss` enum to the concrete loss.
macro_rules! dispatch {
    ($self:expr, $method:ident ( $($arg:expr),* )) => {
        match $self {
            Loss::Logistic => LogisticLoss::default().$method($($arg),*),
            Loss::Squared => SquaredLoss::default().$method($($arg),*),
            Loss::Poisson => PoissonLoss::default().$method($($arg),*),
            Loss::SmoothedHinge => SmoothedHingeLoss::default().$method($($arg),*),
            Loss::Custom(arc) => arc.$method($($arg),*),
        }
    };
}

impl PointwiseLoss for Loss {
    fn evaluate(&self, margin: f64, label: f64) -> (f64, f64) {
        dispatch!(self, evaluate(margin, label))
    }

    fn second_derivative(&self, margin: f64, label: f64) -> f64 {
        dispatch!(self, second_derivative(margin, label))
    }
}

/// Numerically stable `ln(1 + exp(x))`.
#[inline]
fn log1p_exp(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

/// Logistic sigmoid.
#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Negative log-likelihood of the Bernoulli model, stable for large margins
/// of either sign.
#[derive(Default)]
pub struct LogisticLoss {}

impl PointwiseLoss for LogisticLoss {
    #[inline]
    fn evaluate(&self, margin: f64, label: f64) -> (f64, f64) {
        if label > 0.5 {
            (log1p_exp(-margin), -sigmoid(-margin))
        } else {
            (log1p_exp(margin), sigmoid(margin))
        }
    }

    #[inline]
    fn second_derivative(&self, margin: f64, _label: f64) -> f64 {
        let p = sigmoid(margin);
        p * (1.0 - p)
    }
}

/// One-half squared error, so the slope is exactly the residual.
#[derive(Default)]
pub struct SquaredLoss {}

impl PointwiseLoss for SquaredLoss {
    #[inline]
    fn evaluate(&self, margin: f64, label: f64) -> (f64, f64) {
        let residual = margin - label;
        (0.5 * residual * residual, residual)
    }

    #[inline]
    fn second_derivative(&self, _margin: f64, _label: f64) -> f64 {
        1.0
    }
}

/// Poisson negative log-likelihood with a log link, dropping the constant
/// `ln(label!)` term.
#[derive(Default)]
pub struct PoissonLoss {}

impl PointwiseLoss for PoissonLoss {
    #[inline]
    fn evaluate(&self, margin: f64, label: f64) -> (f64, f64) {
        let rate = margin.exp();
        (rate - label * margin, rate - label)
    }

    #[inline]
    fn second_derivative(&self, margin: f64, _label: f64) -> f64 {
        margin.exp()
    }
}

/// Smoothed hinge: quadratic near the decision boundary, linear beyond it,
/// flat once the point is confidently correct.
#[derive(Default)]
pub struct SmoothedHingeLoss {}

impl PointwiseLoss for SmoothedHingeLoss {
    #[inline]
    fn evaluate(&self, margin: f64, label: f64) -> (f64, f64) {
        let sign = if label > 0.5 { 1.0 } else { -1.0 };
        let t = sign * margin;
        if t >= 1.0 {
            (0.0, 0.0)
        } else if t <= 0.0 {
            (0.5 - t, -sign)
        } else {
            (0.5 * (1.0 - t) * (1.0 - t), -sign * (1.0 - t))
        }
    }

    #[inline]
    fn second_derivative(&self, margin: f64, label: f64) -> f64 {
        let sign = if label > 0.5 { 1.0 } else { -1.0 };
        let t = sign * margin;
        if t > 0.0 && t < 1.0 {
            1.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_logistic_at_zero() {
        let loss = LogisticLoss::default();
        let (value, slope) = loss.evaluate(0.0, 1.0);
        assert!((value - std::f64::consts::LN_2).abs() < 1e-15);
        assert_eq!(slope, -0.5);
        let (value, slope) = loss.evaluate(0.0, 0.0);
        assert!((value - std::f64::consts::LN_2).abs() < 1e-15);
        assert_eq!(slope, 0.5);
        assert_eq!(loss.second_derivative(0.0, 1.0), 0.25);
    }

    #[test]
    fn test_logistic_extreme_margins_stay_finite() {
        let loss = LogisticLoss::default();
        let (value, slope) = loss.evaluate(800.0, 0.0);
        assert!((value - 800.0).abs() < 1e-9);
        assert!((slope - 1.0).abs() < 1e-9);
        let (value, slope) = loss.evaluate(-800.0, 1.0);
        assert!((value - 800.0).abs() < 1e-9);
        assert!((slope + 1.0).abs() < 1e-9);
        let (value, slope) = loss.evaluate(800.0, 1.0);
        assert!(value.abs() < 1e-9);
        assert!(slope.abs() < 1e-9);
    }

    #[test]
    fn test_squared_loss() {
        let loss = SquaredLoss::default();
        assert_eq!(loss.evaluate(3.0, 1.0), (2.0, 2.0));
        assert_eq!(loss.evaluate(1.0, 1.0), (0.0, 0.0));
        assert_eq!(loss.second_derivative(5.0, -7.0), 1.0);
    }

    #[test]
    fn test_poisson_loss() {
        let loss = PoissonLoss::default();
        assert_eq!(loss.evaluate(0.0, 2.0), (1.0, -1.0));
        assert_eq!(loss.second_derivative(0.0, 2.0), 1.0);
        let margin = 2.0_f64.ln();
        let (value, slope) = loss.evaluate(margin, 1.0);
        assert!((value - (2.0 - margin)).abs() < 1e-15);
        assert!((slope - 1.0).abs() < 1e-15);
        assert!((loss.second_derivative(margin, 1.0) - 2.0).abs() < 1e-15);
    }

    #[test]
    fn test_smoothed_hinge_regions() {
        let loss = SmoothedHingeLoss::default();
        assert_eq!(loss.evaluate(2.0, 1.0), (0.0, 0.0));
        assert_eq!(loss.evaluate(-1.0, 1.0), (1.5, -1.0));
        assert_eq!(loss.evaluate(0.5, 1.0), (0.125, -0.5));
        assert_eq!(loss.second_derivative(0.5, 1.0), 1.0);
        assert_eq!(loss.second_derivative(2.0, 1.0), 0.0);
        assert_eq!(loss.second_derivative(-1.0, 1.0), 0.0);

        // Label 0 mirrors label 1 across margin 0.
        assert_eq!(loss.evaluate(-2.0, 0.0), (0.0, 0.0));
        assert_eq!(loss.evaluate(1.0, 0.0), (1.5, 1.0));
        assert_eq!(loss.evaluate(-0.5, 0.0), (0.125, 0.5));
    }

    #[test]
    fn test_derivatives_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(17);
        let step = 1e-5;
        let losses: Vec<(Loss, f64)> = vec![
            (Loss::Logistic, 1.0),
            (Loss::Logistic, 0.0),
            (Loss::Squared, 1.7),
            (Loss::Poisson, 3.0),
            (Loss::Poisson, 0.0),
        ];
        for (loss, label) in losses {
            for _ in 0..25 {
                let margin = rng.gen_range(-3.0..3.0);
                let (_, slope) = loss.evaluate(margin, label);
                let up = loss.evaluate(margin + step, label).0;
                let down = loss.evaluate(margin - step, label).0;
                assert!((slope - (up - down) / (2.0 * step)).abs() < 1e-5);

                let curvature = loss.second_derivative(margin, label);
                let slope_up = loss.evaluate(margin + step, label).1;
                let slope_down = loss.evaluate(margin - step, label).1;
                assert!((curvature - (slope_up - slope_down) / (2.0 * step)).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_enum_dispatch_matches_concrete() {
        for margin in [-2.5, 0.0, 0.3, 4.0] {
            assert_eq!(
                Loss::Logistic.evaluate(margin, 1.0),
                LogisticLoss::default().evaluate(margin, 1.0)
            );
            assert_eq!(
                Loss::SmoothedHinge.second_derivative(margin, 0.0),
                SmoothedHingeLoss::default().second_derivative(margin, 0.0)
            );
        }
    }

    #[test]
    fn test_loss_serialization_round_trip() {
        let encoded = serde_json::to_string(&Loss::Poisson).unwrap();
        assert_eq!(encoded, "\"Poisson\"");
        let decoded: Loss = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.evaluate(0.5, 2.0), Loss::Poisson.evaluate(0.5, 2.0));
    }
}

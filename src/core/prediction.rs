//! Output of `predict_with_interval`.

use faer::Col;

/// Which uncertainty the bounds describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntervalType {
    /// The mean response at `x₀`.
    Confidence,
    /// A single new response at `x₀`; adds the error variance.
    #[default]
    Prediction,
}

/// Point predictions with bounds and standard errors, one entry per row of
/// the new design.
///
/// Without a requested interval the bounds collapse onto `fit` and `se` is
/// zero. When an interval was requested but the estimator cannot supply
/// one, bounds and `se` are NaN.
#[derive(Debug, Clone)]
pub struct PredictionResult {
    pub fit: Col<f64>,
    pub lower: Col<f64>,
    pub upper: Col<f64>,
    pub se: Col<f64>,
    pub interval: Option<IntervalType>,
}

impl PredictionResult {
    pub fn point_only(fit: Col<f64>) -> Self {
        let n = fit.nrows();
        Self {
            lower: fit.clone(),
            upper: fit.clone(),
            fit,
            se: Col::zeros(n),
            interval: None,
        }
    }

    pub fn unavailable(fit: Col<f64>, interval: IntervalType) -> Self {
        let nan = Col::from_fn(fit.nrows(), |_| f64::NAN);
        Self {
            fit,
            lower: nan.clone(),
            upper: nan.clone(),
            se: nan,
            interval: Some(interval),
        }
    }

    pub fn with_intervals(
        fit: Col<f64>,
        lower: Col<f64>,
        upper: Col<f64>,
        se: Col<f64>,
        interval: IntervalType,
    ) -> Self {
        Self {
            fit,
            lower,
            upper,
            se,
            interval: Some(interval),
        }
    }

    pub fn len(&self) -> usize {
        self.fit.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An interval was requested and every bound is finite.
    pub fn has_intervals(&self) -> bool {
        self.interval.is_some()
            && self
                .lower
                .iter()
                .chain(self.upper.iter())
                .all(|v| v.is_finite())
    }

    /// `upper - lower` for row `i`.
    pub fn width(&self, i: usize) -> f64 {
        self.upper[i] - self.lower[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_only_collapses_bounds() {
        let pred = PredictionResult::point_only(Col::from_fn(3, |i| i as f64));
        assert_eq!(pred.len(), 3);
        assert!(!pred.has_intervals());
        assert!((0..3).all(|i| pred.width(i) == 0.0 && pred.se[i] == 0.0));
    }

    #[test]
    fn test_unavailable_keeps_fit() {
        let pred = PredictionResult::unavailable(Col::from_fn(2, |i| i as f64), IntervalType::Confidence);
        assert_eq!(pred.fit[1], 1.0);
        assert!(pred.width(0).is_nan());
        assert!(!pred.has_intervals());
        assert_eq!(pred.interval, Some(IntervalType::Confidence));
    }
}

//! Intervals around predictions of a linear fit.

use crate::core::{IntervalType, PredictionResult, RegressionResult};
use crate::inference::CoefficientInference;
use faer::{Col, Mat};

/// Bounds `ŷ ± t · se` for the rows of `x_new`, in the manner of `predict.lm`.
///
/// `unscaled` is the `(X'WX)⁻¹` of the fitted design (with the leading
/// intercept row and column when the model has one); `None` means the fit
/// had no invertible covariance, and the bounds come back NaN. Scale and
/// degrees of freedom are read from `result` so every estimator feeds its
/// own notion of σ² through the same formula:
///
/// - confidence: `se² = σ² x₀'(X'WX)⁻¹x₀`
/// - prediction: `se² = σ² (1 + x₀'(X'WX)⁻¹x₀)`, a new observation of unit weight
pub fn compute_prediction_intervals(
    x_new: &Mat<f64>,
    fit: Col<f64>,
    unscaled: Option<&Mat<f64>>,
    result: &RegressionResult,
    interval: Option<IntervalType>,
    level: f64,
) -> PredictionResult {
    let Some(kind) = interval else {
        return PredictionResult::point_only(fit);
    };
    let has_intercept = result.intercept.is_some();
    let sigma2 = result.mse;
    let df = result.residual_df() as f64;
    let usable = unscaled.filter(|c| c.nrows() == x_new.ncols() + usize::from(has_intercept));

    let Some(c) = usable.filter(|_| df > 0.0 && sigma2 > 0.0) else {
        return PredictionResult::unavailable(fit, kind);
    };

    let t = CoefficientInference::t_critical(df, level);
    let se = Col::from_fn(x_new.nrows(), |i| {
        let row: Vec<f64> = has_intercept
            .then_some(1.0)
            .into_iter()
            .chain((0..x_new.ncols()).map(|j| x_new[(i, j)]))
            .collect();
        let h = quadratic_form(&row, c);
        let var = match kind {
            IntervalType::Confidence => sigma2 * h,
            IntervalType::Prediction => sigma2 * (1.0 + h),
        };
        if var >= 0.0 {
            var.sqrt()
        } else {
            f64::NAN
        }
    });

    let lower = Col::from_fn(fit.nrows(), |i| fit[i] - t * se[i]);
    let upper = Col::from_fn(fit.nrows(), |i| fit[i] + t * se[i]);
    PredictionResult::with_intervals(fit, lower, upper, se, kind)
}

/// `x₀' C x₀`. Entries of C that are NaN belong to aliased columns and are skipped.
fn quadratic_form(x0: &[f64], c: &Mat<f64>) -> f64 {
    x0.iter()
        .enumerate()
        .flat_map(|(i, &xi)| x0.iter().enumerate().map(move |(j, &xj)| (i, j, xi * xj)))
        .filter(|&(i, j, _)| !c[(i, j)].is_nan())
        .map(|(i, j, w)| w * c[(i, j)])
        .sum()
}

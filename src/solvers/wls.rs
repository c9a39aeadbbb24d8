//! Weighted least squares with supplied or estimated variance weights.

use crate::core::{
    IntervalType, PredictionResult, RegressionOptions, RegressionOptionsBuilder, RegressionResult,
};
use crate::inference::compute_prediction_intervals;
use crate::solvers::linear::{
    build_result, linear_predictor, solve_least_squares, unscaled_covariance, validate_data,
    validate_weights, LeastSquaresFit,
};
use crate::solvers::traits::{FittedRegressor, RegressionError, Regressor};
use faer::{Col, Mat};
use tracing::debug;

/// How residual spread is modelled when weights are estimated from the data.
///
/// The `StdDev*` variants regress |eᵢ| to estimate a standard-deviation
/// function sᵢ and use weights 1/ŝᵢ². The `Variance*` variants regress eᵢ²
/// to estimate a variance function vᵢ and use weights 1/v̂ᵢ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VarianceModel {
    /// |e| regressed on the predictors.
    #[default]
    StdDevOnPredictors,
    /// e² regressed on the predictors.
    VarianceOnPredictors,
    /// |e| regressed on the fitted values.
    StdDevOnFitted,
    /// e² regressed on the fitted values.
    VarianceOnFitted,
}

/// Estimate inverse-variance weights from residuals of a preliminary fit.
///
/// # Errors
/// `NumericalError` when the estimated spread is not positive for some row,
/// since the weights would be undefined.
pub fn estimate_variance_weights(
    x: &Mat<f64>,
    fitted_values: &Col<f64>,
    residuals: &Col<f64>,
    model: VarianceModel,
) -> Result<Col<f64>, RegressionError> {
    let n = residuals.nrows();
    let regressors = match model {
        VarianceModel::StdDevOnPredictors | VarianceModel::VarianceOnPredictors => x.clone(),
        VarianceModel::StdDevOnFitted | VarianceModel::VarianceOnFitted => {
            Mat::from_fn(n, 1, |i, _| fitted_values[i])
        }
    };
    let squared = matches!(
        model,
        VarianceModel::VarianceOnPredictors | VarianceModel::VarianceOnFitted
    );
    let target = Col::from_fn(n, |i| {
        if squared {
            residuals[i] * residuals[i]
        } else {
            residuals[i].abs()
        }
    });

    let spread = solve_least_squares(&regressors, &target, None, true, 1e-7)?;

    let mut weights = Col::zeros(n);
    for i in 0..n {
        let s = spread.fitted_values[i];
        if !(s > 0.0) {
            return Err(RegressionError::NumericalError(format!(
                "estimated spread is not positive at row {i} ({s})"
            )));
        }
        weights[i] = if squared { 1.0 / s } else { 1.0 / (s * s) };
    }
    Ok(weights)
}

/// Least squares with observation weights, the remedy for unequal error
/// variance: minimizes `Σ wᵢ (yᵢ - xᵢ'β)²`.
///
/// Weights are either supplied or estimated from the residuals of a
/// preliminary fit (see [`VarianceModel`]). Rows of zero weight are kept in
/// the residuals but do not count towards `n_observations`.
///
/// ```rust,ignore
/// let fitted = WlsRegressor::builder()
///     .estimate_weights(VarianceModel::StdDevOnPredictors)
///     .iterations(2)
///     .build()
///     .fit(&x, &y)?;
/// println!("{:?}", fitted.weights());
/// ```
#[derive(Debug, Clone)]
pub struct WlsRegressor {
    options: RegressionOptions,
    weights: Option<Col<f64>>,
    variance_model: Option<VarianceModel>,
    iterations: usize,
}

impl WlsRegressor {
    pub fn builder() -> WlsRegressorBuilder {
        WlsRegressorBuilder::default()
    }

    fn solve(
        &self,
        x: &Mat<f64>,
        y: &Col<f64>,
        weights: &Col<f64>,
    ) -> Result<LeastSquaresFit, RegressionError> {
        solve_least_squares(
            x,
            y,
            Some(weights),
            self.options.with_intercept,
            self.options.rank_tolerance,
        )
    }
}

impl Regressor for WlsRegressor {
    type Fitted = FittedWls;

    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError> {
        self.options.validate()?;
        validate_data(x, y, self.options.with_intercept)?;
        let mut weights = match &self.weights {
            Some(w) => {
                validate_weights(w, x.nrows())?;
                w.clone()
            }
            None => Col::from_fn(x.nrows(), |_| 1.0),
        };

        let needed = x.ncols() + usize::from(self.options.with_intercept);
        let positive = weights.iter().filter(|&&w| w > 0.0).count();
        if positive < needed {
            return Err(RegressionError::InsufficientObservations { needed, got: positive });
        }

        let mut fit = self.solve(x, y, &weights)?;

        if let Some(model) = self.variance_model {
            for iteration in 0..self.iterations.max(1) {
                let previous = fit.coefficients.clone();
                weights = estimate_variance_weights(x, &fit.fitted_values, &fit.residuals, model)?;
                fit = self.solve(x, y, &weights)?;

                let change = previous
                    .iter()
                    .zip(fit.coefficients.iter())
                    .filter(|(a, b)| a.is_finite() && b.is_finite())
                    .map(|(a, b)| (a - b).abs())
                    .fold(0.0_f64, f64::max);
                debug!(iteration, change, "re-estimated variance weights");
            }
        }

        let result = build_result(x, y, Some(&weights), &fit, &self.options);
        let xtwx_inverse = unscaled_covariance(x, Some(&weights), &fit);

        Ok(FittedWls {
            options: self.options.clone(),
            weights,
            result,
            xtwx_inverse,
        })
    }
}

/// Result of [`WlsRegressor::fit`].
#[derive(Debug, Clone)]
pub struct FittedWls {
    options: RegressionOptions,
    weights: Col<f64>,
    result: RegressionResult,
    xtwx_inverse: Option<Mat<f64>>,
}

impl FittedWls {
    pub fn options(&self) -> &RegressionOptions {
        &self.options
    }

    /// Weights of the final fit, supplied or estimated.
    pub fn weights(&self) -> &Col<f64> {
        &self.weights
    }

    /// Residuals scaled by √wᵢ; roughly homoscedastic when the weights are right.
    pub fn weighted_residuals(&self) -> Col<f64> {
        Col::from_fn(self.weights.nrows(), |i| {
            self.weights[i].sqrt() * self.result.residuals[i]
        })
    }
}

impl FittedRegressor for FittedWls {
    fn predict(&self, x: &Mat<f64>) -> Col<f64> {
        linear_predictor(
            x,
            &self.result.coefficients,
            &self.result.aliased,
            self.result.intercept,
        )
    }

    fn result(&self) -> &RegressionResult {
        &self.result
    }

    /// Prediction intervals assume unit weight for the new observations.
    fn predict_with_interval(
        &self,
        x: &Mat<f64>,
        interval: Option<IntervalType>,
        level: f64,
    ) -> PredictionResult {
        compute_prediction_intervals(
            x,
            self.predict(x),
            self.xtwx_inverse.as_ref(),
            &self.result,
            interval,
            level,
        )
    }
}

/// Builder for [`WlsRegressor`].
#[derive(Debug, Clone, Default)]
pub struct WlsRegressorBuilder {
    builder: RegressionOptionsBuilder,
    weights: Option<Col<f64>>,
    variance_model: Option<VarianceModel>,
    iterations: Option<usize>,
}

impl WlsRegressorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_intercept(mut self, include: bool) -> Self {
        self.builder = self.builder.with_intercept(include);
        self
    }

    pub fn compute_inference(mut self, compute: bool) -> Self {
        self.builder = self.builder.compute_inference(compute);
        self
    }

    pub fn confidence_level(mut self, level: f64) -> Self {
        self.builder = self.builder.confidence_level(level);
        self
    }

    /// Finite, non-negative, not all zero, one per row of `x`. Checked at `fit`.
    pub fn weights(mut self, weights: Col<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Estimate weights from OLS residuals with the given variance model.
    ///
    /// Supplied weights, if any, are only used for the preliminary fit.
    pub fn estimate_weights(mut self, model: VarianceModel) -> Self {
        self.variance_model = Some(model);
        self
    }

    /// Number of times estimated weights are recomputed (default 1).
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = Some(iterations);
        self
    }

    pub fn build(self) -> WlsRegressor {
        WlsRegressor {
            options: self.builder.build_unchecked(),
            weights: self.weights,
            variance_model: self.variance_model,
            iterations: self.iterations.unwrap_or(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weights_fall_as_spread_grows() {
        let x = Mat::from_fn(20, 1, |i, _| i as f64 + 1.0);
        let fitted = Col::from_fn(20, |i| 3.0 * i as f64);
        // spread grows linearly with x
        let residuals = Col::from_fn(20, |i| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            sign * 0.5 * (i + 1) as f64
        });

        let w = estimate_variance_weights(&x, &fitted, &residuals, VarianceModel::StdDevOnPredictors)
            .expect("weights should be estimable");
        assert!(w[0] > w[10] && w[10] > w[19]);
        // |e| = 0.5 x exactly, so w = 1 / (0.5 x)²
        assert_relative_eq!(w[3], 0.25, epsilon = 1e-8);
    }

    #[test]
    fn test_negative_spread_estimate_is_an_error() {
        let x = Mat::from_fn(4, 1, |i, _| i as f64);
        let fitted = Col::zeros(4);
        // |e| = [6, 3, 1, 0] has fitted line 5.5 - 2x, negative at x = 3
        let residuals = Col::from_fn(4, |i| [6.0, -3.0, 1.0, 0.0][i]);

        let result =
            estimate_variance_weights(&x, &fitted, &residuals, VarianceModel::StdDevOnPredictors);
        assert!(matches!(result, Err(RegressionError::NumericalError(_))));
    }
}

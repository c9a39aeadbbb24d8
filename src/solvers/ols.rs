//! Ordinary least squares, the baseline every remedy is compared against.

use crate::core::{
    IntervalType, PredictionResult, RegressionOptions, RegressionOptionsBuilder, RegressionResult,
};
use crate::inference::compute_prediction_intervals;
use crate::solvers::linear::{
    build_result, linear_predictor, solve_least_squares, unscaled_covariance, validate_data,
};
use crate::solvers::traits::{FittedRegressor, RegressionError, Regressor};
use faer::{Col, Mat};

/// Unweighted least squares with Gaussian inference.
///
/// Columns that are linearly dependent on earlier columns are aliased and
/// their coefficients are set to NaN, as in R's `lm`.
///
/// # Example
///
/// ```rust,ignore
/// use regression_remedies::datasets;
/// use regression_remedies::solvers::{FittedRegressor, OlsRegressor, Regressor};
///
/// let cars = datasets::cars();
/// let x = cars.design(&["speed"])?;
/// let y = cars.column("dist")?;
///
/// let fitted = OlsRegressor::builder().with_intercept(true).build().fit(&x, &y)?;
///
/// println!("R² = {}", fitted.r_squared());
/// println!("Coefficients: {:?}", fitted.coefficients());
/// ```
#[derive(Debug, Clone)]
pub struct OlsRegressor {
    options: RegressionOptions,
}

impl OlsRegressor {
    pub fn new(options: RegressionOptions) -> Self {
        Self { options }
    }

    pub fn builder() -> OlsRegressorBuilder {
        OlsRegressorBuilder::default()
    }

    pub fn options(&self) -> &RegressionOptions {
        &self.options
    }
}

impl Regressor for OlsRegressor {
    type Fitted = FittedOls;

    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError> {
        self.options.validate()?;
        validate_data(x, y, self.options.with_intercept)?;

        let fit = solve_least_squares(
            x,
            y,
            None,
            self.options.with_intercept,
            self.options.rank_tolerance,
        )?;
        let result = build_result(x, y, None, &fit, &self.options);
        let xtx_inverse = unscaled_covariance(x, None, &fit);

        Ok(FittedOls {
            options: self.options.clone(),
            result,
            xtx_inverse,
        })
    }
}

/// Result of [`OlsRegressor::fit`].
#[derive(Debug, Clone)]
pub struct FittedOls {
    options: RegressionOptions,
    result: RegressionResult,
    /// Over `[1 | X]` when the model has an intercept, aliased columns excluded.
    xtx_inverse: Option<Mat<f64>>,
}

impl FittedOls {
    pub fn options(&self) -> &RegressionOptions {
        &self.options
    }

    /// Unscaled covariance `(X'X)⁻¹` of the fitted design, if invertible.
    pub fn xtx_inverse(&self) -> Option<&Mat<f64>> {
        self.xtx_inverse.as_ref()
    }
}

impl FittedRegressor for FittedOls {
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

    fn predict_with_interval(
        &self,
        x: &Mat<f64>,
        interval: Option<IntervalType>,
        level: f64,
    ) -> PredictionResult {
        compute_prediction_intervals(
            x,
            self.predict(x),
            self.xtx_inverse.as_ref(),
            &self.result,
            interval,
            level,
        )
    }
}

/// Builder for [`OlsRegressor`]; option errors surface from `fit`.
#[derive(Debug, Clone, Default)]
pub struct OlsRegressorBuilder {
    builder: RegressionOptionsBuilder,
}

impl OlsRegressorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit an intercept column (default `true`).
    pub fn with_intercept(mut self, include: bool) -> Self {
        self.builder = self.builder.with_intercept(include);
        self
    }

    /// Skip standard errors, t tests and coefficient intervals when `false`.
    pub fn compute_inference(mut self, compute: bool) -> Self {
        self.builder = self.builder.compute_inference(compute);
        self
    }

    pub fn confidence_level(mut self, level: f64) -> Self {
        self.builder = self.builder.confidence_level(level);
        self
    }

    /// Columns whose residual norm after projection falls below
    /// `tol * original norm` are aliased.
    pub fn rank_tolerance(mut self, tol: f64) -> Self {
        self.builder = self.builder.rank_tolerance(tol);
        self
    }

    pub fn build(self) -> OlsRegressor {
        OlsRegressor::new(self.builder.build_unchecked())
    }
}

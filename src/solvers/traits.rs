//! The estimator/fitted-model split shared by every remedy, and its error type.

use crate::core::{IntervalType, PredictionResult, RegressionResult};
use faer::{Col, Mat};
use thiserror::Error;

/// Why a fit was refused or failed.
#[derive(Debug, Error)]
pub enum RegressionError {
    #[error("dimension mismatch: X has {x_rows} rows but y has {y_len} elements")]
    DimensionMismatch { x_rows: usize, y_len: usize },

    #[error("insufficient observations: need at least {needed}, got {got}")]
    InsufficientObservations { needed: usize, got: usize },

    /// Every column aliased, or a covariance that cannot be inverted.
    #[error("matrix is singular or nearly singular")]
    SingularMatrix,

    #[error("invalid options: {0}")]
    InvalidOptions(#[from] crate::core::OptionsError),

    #[error("invalid weights: weights must be finite, non-negative and not all zero")]
    InvalidWeights,

    #[error("data contains NaN or infinite values")]
    NonFiniteData,

    #[error("residual scale is zero; the robust fit is degenerate")]
    DegenerateScale,

    /// An iteration produced non-finite values.
    #[error("numerical error: {0}")]
    NumericalError(String),
}

/// Configuration for one estimator. `fit` never mutates it, so a single
/// regressor can be fitted to many datasets.
pub trait Regressor {
    type Fitted: FittedRegressor;

    /// `x` holds one row per observation and one column per predictor, with
    /// no column of ones; the intercept is controlled by the options.
    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError>;
}

/// A fitted model.
pub trait FittedRegressor {
    /// Point predictions for new rows. Aliased columns contribute nothing.
    fn predict(&self, x: &Mat<f64>) -> Col<f64>;

    fn result(&self) -> &RegressionResult;

    fn coefficients(&self) -> &Col<f64> {
        &self.result().coefficients
    }

    fn intercept(&self) -> Option<f64> {
        self.result().intercept
    }

    fn residuals(&self) -> &Col<f64> {
        &self.result().residuals
    }

    fn r_squared(&self) -> f64 {
        self.result().r_squared
    }

    /// Out-of-sample R² of the predictions for `x` against `y`.
    ///
    /// A constant `y` scores 1 when predicted exactly and 0 otherwise.
    fn score(&self, x: &Mat<f64>, y: &Col<f64>) -> f64 {
        let predicted = self.predict(x);
        let mean = y.iter().sum::<f64>() / y.nrows() as f64;
        let (sse, sst) = y
            .iter()
            .zip(predicted.iter())
            .fold((0.0, 0.0), |(sse, sst), (&yi, &pi)| {
                (sse + (yi - pi).powi(2), sst + (yi - mean).powi(2))
            });

        match (sst == 0.0, sse == 0.0) {
            (true, true) => 1.0,
            (true, false) => 0.0,
            _ => 1.0 - sse / sst,
        }
    }

    /// Point predictions with optional bounds at `level`, in the manner of
    /// `predict.lm(..., interval = )`.
    ///
    /// Least squares fits (OLS, WLS, GLS) use the t distribution on the
    /// residual degrees of freedom. M-estimators and LTS reuse the same
    /// formula with their robust scale. Quantile fits return NaN bounds.
    fn predict_with_interval(
        &self,
        x: &Mat<f64>,
        interval: Option<IntervalType>,
        level: f64,
    ) -> PredictionResult;
}

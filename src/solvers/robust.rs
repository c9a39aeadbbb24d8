//! Robust regression by M-estimation.
//!
//! Iteratively reweighted least squares (IRLS) following `MASS::rlm`:
//!
//! 1. Start from the least squares fit.
//! 2. Scale s = median(|e|) / 0.6745.
//! 3. Weights wᵢ = ψ(eᵢ/s) / (eᵢ/s).
//! 4. Refit by weighted least squares.
//! 5. Stop when ‖e_new - e_old‖ / ‖e_old‖ falls below the tolerance.
//!
//! Standard errors use the asymptotic covariance of `summary.rlm`:
//!
//! ```text
//! S  = Σ (s ψ(uᵢ))² / (n - p)      m = mean ψ'(uᵢ)
//! κ  = 1 + p var(ψ') / (n m²)      σ_β = √S κ / m
//! Cov(β) = σ_β² (X'X)⁻¹
//! ```
//!
//! The fitted result reports the robust scale s as `sigma`, `rmse` and
//! `√mse`; σ_β is kept apart as [`FittedRobust::coefficient_scale`].

use crate::core::{
    IntervalType, PredictionResult, PsiFunction, RegressionOptions, RegressionOptionsBuilder,
    RegressionResult,
};
use crate::inference::{compute_prediction_intervals, CoefficientInference};
use crate::solvers::linear::{
    build_result, linear_predictor, solve_least_squares, unscaled_covariance, validate_data,
    validate_weights,
};
use crate::solvers::traits::{FittedRegressor, RegressionError, Regressor};
use crate::utils::{mad_about_zero, mean, sample_variance};
use faer::{Col, Mat};
use tracing::{debug, warn};

/// Robust M-estimator (Huber, Hampel or bisquare).
///
/// # Example
///
/// ```rust,ignore
/// use regression_remedies::core::PsiFunction;
/// use regression_remedies::solvers::{RobustRegressor, Regressor};
///
/// let fitted = RobustRegressor::builder()
///     .psi(PsiFunction::bisquare())
///     .build()
///     .fit(&x, &y)?;
/// println!("downweighted rows: {:?}", fitted.downweighted(0.5));
/// ```
#[derive(Debug, Clone)]
pub struct RobustRegressor {
    options: RegressionOptions,
    psi: PsiFunction,
    scale: Option<f64>,
    prior_weights: Option<Col<f64>>,
}

impl RobustRegressor {
    /// Create a new robust regressor with the given options and psi function.
    pub fn new(options: RegressionOptions, psi: PsiFunction) -> Self {
        Self {
            options,
            psi,
            scale: None,
            prior_weights: None,
        }
    }

    /// Huber ψ with k = 1.345 and the `rlm` iteration defaults.
    pub fn builder() -> RobustRegressorBuilder {
        RobustRegressorBuilder::default()
    }

    /// Psi function used by this regressor.
    pub fn psi(&self) -> PsiFunction {
        self.psi
    }
}

impl Regressor for RobustRegressor {
    type Fitted = FittedRobust;

    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError> {
        self.options.validate()?;
        self.psi.validate()?;
        validate_data(x, y, self.options.with_intercept)?;
        let n = x.nrows();

        let prior = match &self.prior_weights {
            Some(w) => {
                validate_weights(w, n)?;
                w.clone()
            }
            None => Col::from_fn(n, |_| 1.0),
        };
        if let Some(s) = self.scale {
            if !(s > 0.0 && s.is_finite()) {
                return Err(RegressionError::DegenerateScale);
            }
        }

        let solve = |w: &Col<f64>| {
            solve_least_squares(
                x,
                y,
                Some(w),
                self.options.with_intercept,
                self.options.rank_tolerance,
            )
        };

        // A scale this small relative to y means the fit is exact
        let scale_floor = 1e-10 * y.iter().fold(1.0_f64, |m, v| m.max(v.abs()));

        let mut fit = solve(&prior)?;
        let mut weights = prior.clone();
        let mut scale = f64::NAN;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.options.max_iterations {
            iterations += 1;

            let resid: Vec<f64> = fit.residuals.iter().copied().collect();
            scale = match self.scale {
                Some(s) => s,
                None => mad_about_zero(&resid),
            };
            if !(scale > scale_floor) {
                return Err(RegressionError::DegenerateScale);
            }

            weights = Col::from_fn(n, |i| prior[i] * self.psi.weight(resid[i] / scale));
            if weights.iter().sum::<f64>() <= 0.0 {
                return Err(RegressionError::DegenerateScale);
            }

            let next = solve(&weights)?;
            let change = residual_change(&fit.residuals, &next.residuals);
            fit = next;
            debug!(iteration = iterations, scale, change, psi = self.psi.name(), "IRLS step");

            if change <= self.options.tolerance {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                iterations,
                psi = self.psi.name(),
                "robust fit did not converge"
            );
        }

        let mut silent = self.options.clone();
        silent.compute_inference = false;
        let mut result = build_result(x, y, Some(&weights), &fit, &silent);
        result.n_observations = n;
        result.sigma = scale;
        result.log_likelihood = f64::NAN;
        result.aic = f64::NAN;
        result.aicc = f64::NAN;
        result.bic = f64::NAN;

        // Asymptotic covariance uses the prior-weighted design, not the IRLS weights
        let xtx_inverse = unscaled_covariance(x, self.prior_weights.as_ref(), &fit);
        let sigma_beta = self.coefficient_scale(&fit.residuals, &prior, scale, fit.n_params());
        result.mse = scale * scale;
        result.rmse = scale;

        let df = result.residual_df() as f64;
        if self.options.compute_inference && df > 0.0 && sigma_beta.is_finite() {
            if let Some(cov) = &xtx_inverse {
                CoefficientInference::apply(&mut result, cov, sigma_beta * sigma_beta, df);
            }
        }

        Ok(FittedRobust {
            options: self.options.clone(),
            psi: self.psi,
            result,
            scale,
            sigma_beta,
            weights,
            iterations,
            converged,
            xtx_inverse,
        })
    }
}

impl RobustRegressor {
    /// σ_β = √S κ / m from `summary.rlm`.
    fn coefficient_scale(&self, residuals: &Col<f64>, prior: &Col<f64>, scale: f64, p: usize) -> f64 {
        let n = residuals.nrows();
        if n <= p {
            return f64::NAN;
        }

        let u: Vec<f64> = (0..n)
            .map(|i| prior[i].sqrt() * residuals[i] / scale)
            .collect();
        let s: f64 = u
            .iter()
            .map(|&ui| (scale * self.psi.psi(ui)).powi(2))
            .sum::<f64>()
            / (n - p) as f64;

        let psi_prime: Vec<f64> = u.iter().map(|&ui| self.psi.derivative(ui)).collect();
        let m = mean(&psi_prime);
        if !(m > 0.0) {
            return f64::NAN;
        }
        let kappa = 1.0 + p as f64 * sample_variance(&psi_prime) / (n as f64 * m * m);

        s.sqrt() * kappa / m
    }
}

/// `‖new - old‖ / ‖old‖`, the `rlm` residual convergence criterion.
fn residual_change(old: &Col<f64>, new: &Col<f64>) -> f64 {
    let diff: f64 = old
        .iter()
        .zip(new.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum();
    let base: f64 = old.iter().map(|a| a * a).sum();
    (diff / base.max(1e-20)).sqrt()
}

/// A fitted robust M-estimation model.
#[derive(Debug, Clone)]
pub struct FittedRobust {
    options: RegressionOptions,
    psi: PsiFunction,
    result: RegressionResult,
    scale: f64,
    sigma_beta: f64,
    weights: Col<f64>,
    iterations: usize,
    converged: bool,
    xtx_inverse: Option<Mat<f64>>,
}

impl FittedRobust {
    /// Options after applying the robust presets.
    pub fn options(&self) -> &RegressionOptions {
        &self.options
    }

    /// Psi function used in the fit.
    pub fn psi(&self) -> PsiFunction {
        self.psi
    }

    /// Robust residual scale from the last iteration.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// σ_β, so that `Cov(β) = σ_β² (X'X)⁻¹`.
    pub fn coefficient_scale(&self) -> f64 {
        self.sigma_beta
    }

    /// Final IRLS weights (times any prior weights).
    pub fn weights(&self) -> &Col<f64> {
        &self.weights
    }

    /// Number of IRLS iterations performed.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Whether the residual change fell below the tolerance.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Rows whose final weight is below `threshold`.
    pub fn downweighted(&self, threshold: f64) -> Vec<usize> {
        self.weights
            .iter()
            .enumerate()
            .filter(|(_, &w)| w < threshold)
            .map(|(i, _)| i)
            .collect()
    }
}

impl FittedRegressor for FittedRobust {
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

    /// Confidence bands use `σ_β² h`; prediction bands add `s²` for the new
    /// observation.
    fn predict_with_interval(
        &self,
        x: &Mat<f64>,
        interval: Option<IntervalType>,
        level: f64,
    ) -> PredictionResult {
        // Rescale so that s² · C = σ_β² (X'X)⁻¹
        let ratio = (self.sigma_beta / self.scale).powi(2);
        let covariance = self
            .xtx_inverse
            .as_ref()
            .filter(|_| ratio.is_finite())
            .map(|c| Mat::from_fn(c.nrows(), c.ncols(), |i, j| ratio * c[(i, j)]));
        compute_prediction_intervals(
            x,
            self.predict(x),
            covariance.as_ref(),
            &self.result,
            interval,
            level,
        )
    }
}

/// Builder for `RobustRegressor`.
#[derive(Debug, Clone)]
pub struct RobustRegressorBuilder {
    builder: RegressionOptionsBuilder,
    psi: PsiFunction,
    scale: Option<f64>,
    prior_weights: Option<Col<f64>>,
}

impl Default for RobustRegressorBuilder {
    fn default() -> Self {
        Self {
            builder: RegressionOptionsBuilder::from_options(RegressionOptions::robust()),
            psi: PsiFunction::default(),
            scale: None,
            prior_weights: None,
        }
    }
}

impl RobustRegressorBuilder {
    /// Create a new builder with `rlm` defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit an intercept (default `true`).
    pub fn with_intercept(mut self, include: bool) -> Self {
        self.builder = self.builder.with_intercept(include);
        self
    }

    /// Turn the asymptotic coefficient table on or off.
    pub fn compute_inference(mut self, compute: bool) -> Self {
        self.builder = self.builder.compute_inference(compute);
        self
    }

    /// Level of the coefficient intervals (default 0.95).
    pub fn confidence_level(mut self, level: f64) -> Self {
        self.builder = self.builder.confidence_level(level);
        self
    }

    /// Set the psi function.
    pub fn psi(mut self, psi: PsiFunction) -> Self {
        self.psi = psi;
        self
    }

    /// Use a known residual scale instead of re-estimating the MAD.
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Prior observation weights, multiplied into the IRLS weights.
    pub fn prior_weights(mut self, weights: Col<f64>) -> Self {
        self.prior_weights = Some(weights);
        self
    }

    /// Maximum IRLS iterations (default 20).
    pub fn max_iterations(mut self, max_iter: usize) -> Self {
        self.builder = self.builder.max_iterations(max_iter);
        self
    }

    /// Convergence tolerance on the relative residual change (default 1e-4).
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.builder = self.builder.tolerance(tol);
        self
    }

    /// Build the robust regressor.
    pub fn build(self) -> RobustRegressor {
        RobustRegressor {
            options: self.builder.build_unchecked(),
            psi: self.psi,
            scale: self.scale,
            prior_weights: self.prior_weights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_residual_change() {
        let a = Col::from_fn(2, |i| if i == 0 { 3.0 } else { 4.0 });
        let b = Col::from_fn(2, |i| if i == 0 { 3.0 } else { 4.0 });
        assert_eq!(residual_change(&a, &b), 0.0);

        let c = Col::zeros(2);
        assert!((residual_change(&a, &c) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_outlier_is_downweighted() {
        let x = Mat::from_fn(20, 1, |i, _| i as f64);
        let mut y = Col::from_fn(20, |i| {
            1.0 + 2.0 * i as f64 + if i % 2 == 0 { 0.3 } else { -0.3 }
        });
        y[10] += 40.0;

        let fitted = RobustRegressor::builder()
            .psi(PsiFunction::bisquare())
            .build()
            .fit(&x, &y)
            .expect("fit should succeed");

        assert!((fitted.coefficients()[0] - 2.0).abs() < 0.05);
        assert!(fitted.weights()[10] < 0.01);
        assert_eq!(fitted.downweighted(0.5), vec![10]);
    }

    #[test]
    fn test_prediction_band_adds_scale_to_coefficient_band() {
        let x = Mat::from_fn(20, 1, |i, _| i as f64);
        let mut y = Col::from_fn(20, |i| 1.0 + 2.0 * i as f64 + ((i * 7) % 5) as f64 * 0.2);
        y[4] -= 15.0;
        let fitted = RobustRegressor::builder().build().fit(&x, &y).expect("fit");

        let s = fitted.scale();
        assert!((fitted.result().mse - s * s).abs() < 1e-12);
        assert!((fitted.result().rmse - s).abs() < 1e-12);
        assert!(fitted.coefficient_scale() > 0.0);

        let x_new = Mat::from_fn(3, 1, |i, _| 5.0 * i as f64);
        let conf = fitted.predict_with_interval(&x_new, Some(IntervalType::Confidence), 0.95);
        let pred = fitted.predict_with_interval(&x_new, Some(IntervalType::Prediction), 0.95);
        for i in 0..3 {
            let expected = (s * s + conf.se[i] * conf.se[i]).sqrt();
            assert!((pred.se[i] - expected).abs() < 1e-10);
        }

        // Slope standard error is σ_β √C₁₁, the same covariance the bands use
        let sb = fitted.coefficient_scale();
        let se_slope = fitted.result().std_errors.as_ref().expect("inference")[0];
        let sxx: f64 = (0..20).map(|i| (i as f64 - 9.5).powi(2)).sum();
        assert!((se_slope - sb / sxx.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_exact_fit_has_degenerate_scale() {
        let x = Mat::from_fn(10, 1, |i, _| i as f64);
        let y = Col::from_fn(10, |i| 3.0 * i as f64);

        let result = RobustRegressor::builder().build().fit(&x, &y);
        assert!(matches!(result, Err(RegressionError::DegenerateScale)));
    }
}

//! Generalized Least Squares with AR(1) errors.
//!
//! Model: yₜ = xₜ'β + εₜ with εₜ = φ εₜ₋₁ + uₜ, |φ| < 1 and uₜ iid N(0, σ²).
//! Rows must be in time order.
//!
//! For a given φ the Prais-Winsten transform whitens the errors:
//!
//! ```text
//! y*₀ = √(1 - φ²) y₀        y*ₜ = yₜ - φ yₜ₋₁   (t ≥ 1)
//! ```
//!
//! and likewise for every design column, including the intercept. β is the
//! least squares solution of the transformed problem. φ is either fixed,
//! chosen to maximize the profile likelihood, or iterated from residuals.

use crate::core::{
    IntervalType, OptionsError, PredictionResult, RegressionOptions, RegressionOptionsBuilder,
    RegressionResult,
};
use crate::inference::{compute_prediction_intervals, CoefficientInference};
use crate::solvers::linear::{
    linear_predictor, set_information_criteria, solve_least_squares, validate_data,
    LeastSquaresFit,
};
use crate::solvers::traits::{FittedRegressor, RegressionError, Regressor};
use crate::utils::{design_matrix, inverse_cross_product, invert_symmetric};
use faer::{Col, Mat};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use tracing::{debug, warn};

/// Largest |φ| considered during estimation.
const PHI_BOUND: f64 = 0.999;

/// How the AR(1) coefficient φ is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CorrelationEstimation {
    /// Maximize the profile log-likelihood over φ (like `nlme::gls(method = "ML")`).
    #[default]
    MaximumLikelihood,
    /// Start from the lag-1 autocorrelation of OLS residuals and alternate
    /// between estimating β and re-estimating φ.
    IteratedPraisWinsten,
    /// Use the given φ.
    Fixed(f64),
}

/// GLS estimator for linear models with AR(1) errors.
///
/// # Example
///
/// ```rust,ignore
/// use regression_remedies::solvers::{GlsRegressor, Regressor};
///
/// let fitted = GlsRegressor::builder().build().fit(&x, &y)?;
/// println!("phi = {:.3}", fitted.phi());
/// ```
#[derive(Debug, Clone)]
pub struct GlsRegressor {
    options: RegressionOptions,
    estimation: CorrelationEstimation,
}

/// Transformed-scale solution for one value of φ.
struct ProfilePoint {
    phi: f64,
    fit: LeastSquaresFit,
    log_likelihood: f64,
}

impl GlsRegressor {
    /// Create a new GLS regressor.
    pub fn new(options: RegressionOptions, estimation: CorrelationEstimation) -> Self {
        Self {
            options,
            estimation,
        }
    }

    pub fn builder() -> GlsRegressorBuilder {
        GlsRegressorBuilder::default()
    }

    /// Solve the transformed least squares problem for a fixed φ.
    fn profile(
        &self,
        design: &Mat<f64>,
        y: &Col<f64>,
        phi: f64,
    ) -> Result<ProfilePoint, RegressionError> {
        let (design_star, y_star) = prais_winsten(design, y, phi);
        let fit = solve_least_squares(
            &design_star,
            &y_star,
            None,
            false,
            self.options.rank_tolerance,
        )?;

        let n = y.nrows() as f64;
        let rss: f64 = fit.residuals.iter().map(|r| r * r).sum();
        let log_likelihood = if rss > 0.0 {
            -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + (rss / n).ln() + 1.0)
                + 0.5 * (1.0 - phi * phi).ln()
        } else {
            f64::NAN
        };

        Ok(ProfilePoint {
            phi,
            fit,
            log_likelihood,
        })
    }

    /// Maximize the profile log-likelihood: coarse grid, then golden section.
    fn maximize_likelihood(
        &self,
        design: &Mat<f64>,
        y: &Col<f64>,
    ) -> Result<(ProfilePoint, usize, bool), RegressionError> {
        let objective = |phi: f64| -> Result<f64, RegressionError> {
            let ll = self.profile(design, y, phi)?.log_likelihood;
            Ok(if ll.is_nan() { f64::NEG_INFINITY } else { ll })
        };

        const GRID: usize = 40;
        let step = 2.0 * PHI_BOUND / GRID as f64;
        let mut best_idx = 0;
        let mut best_ll = f64::NEG_INFINITY;
        for k in 0..=GRID {
            let ll = objective(-PHI_BOUND + k as f64 * step)?;
            if ll > best_ll {
                best_ll = ll;
                best_idx = k;
            }
        }

        let mut lo = (-PHI_BOUND + (best_idx as f64 - 1.0) * step).max(-PHI_BOUND);
        let mut hi = (-PHI_BOUND + (best_idx as f64 + 1.0) * step).min(PHI_BOUND);

        let inv_golden = (5.0_f64.sqrt() - 1.0) / 2.0;
        let mut c = hi - inv_golden * (hi - lo);
        let mut d = lo + inv_golden * (hi - lo);
        let mut fc = objective(c)?;
        let mut fd = objective(d)?;

        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.options.max_iterations {
            iterations += 1;
            if (hi - lo).abs() < self.options.tolerance {
                converged = true;
                break;
            }
            if fc > fd {
                hi = d;
                d = c;
                fd = fc;
                c = hi - inv_golden * (hi - lo);
                fc = objective(c)?;
            } else {
                lo = c;
                c = d;
                fc = fd;
                d = lo + inv_golden * (hi - lo);
                fd = objective(d)?;
            }
            debug!(iteration = iterations, lo, hi, "golden-section step for phi");
        }

        let point = self.profile(design, y, 0.5 * (lo + hi))?;
        Ok((point, iterations, converged))
    }

    /// Alternate β and φ updates from raw residuals.
    fn iterate_prais_winsten(
        &self,
        design: &Mat<f64>,
        y: &Col<f64>,
    ) -> Result<(ProfilePoint, usize, bool), RegressionError> {
        let mut point = self.profile(design, y, 0.0)?;
        let mut phi = lag_one_coefficient(&raw_residuals(design, y, &point.fit));

        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.options.max_iterations {
            iterations += 1;
            point = self.profile(design, y, phi)?;
            let next = lag_one_coefficient(&raw_residuals(design, y, &point.fit));
            debug!(iteration = iterations, phi, next, "Prais-Winsten update");
            let delta = (next - phi).abs();
            phi = next;
            if delta < self.options.tolerance {
                converged = true;
                break;
            }
        }

        let point = self.profile(design, y, phi)?;
        Ok((point, iterations, converged))
    }
}

impl Regressor for GlsRegressor {
    type Fitted = FittedGls;

    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError> {
        self.options.validate()?;
        validate_data(x, y, self.options.with_intercept)?;

        let n = x.nrows();
        let n_coef = x.ncols() + usize::from(self.options.with_intercept);
        if n < n_coef + 2 {
            return Err(RegressionError::InsufficientObservations {
                needed: n_coef + 2,
                got: n,
            });
        }

        let design = design_matrix(x, self.options.with_intercept);
        let (point, iterations, converged) = match self.estimation {
            CorrelationEstimation::Fixed(phi) => {
                if !(phi > -1.0 && phi < 1.0) {
                    return Err(OptionsError::InvalidAutocorrelation(phi).into());
                }
                (self.profile(&design, y, phi)?, 0, true)
            }
            CorrelationEstimation::MaximumLikelihood => self.maximize_likelihood(&design, y)?,
            CorrelationEstimation::IteratedPraisWinsten => {
                self.iterate_prais_winsten(&design, y)?
            }
        };

        if !converged {
            warn!(iterations, phi = point.phi, "AR(1) estimation did not converge");
        }

        let phi_estimated = !matches!(self.estimation, CorrelationEstimation::Fixed(_));
        let (result, xtx_inverse, normalized_residuals) =
            self.assemble(x, y, &design, &point, phi_estimated);

        Ok(FittedGls {
            options: self.options.clone(),
            result,
            phi: point.phi,
            iterations,
            converged,
            xtx_inverse,
            normalized_residuals,
        })
    }
}

impl GlsRegressor {
    /// Map the transformed solution back to the original scale and compute statistics.
    fn assemble(
        &self,
        x: &Mat<f64>,
        y: &Col<f64>,
        design: &Mat<f64>,
        point: &ProfilePoint,
        phi_estimated: bool,
    ) -> (RegressionResult, Option<Mat<f64>>, Col<f64>) {
        let n = y.nrows();
        let p = x.ncols();
        let with_intercept = self.options.with_intercept;
        let offset = usize::from(with_intercept);
        let fit = &point.fit;

        let intercept = with_intercept.then(|| fit.coefficients[0]);
        let coefficients = Col::from_fn(p, |j| fit.coefficients[j + offset]);
        let aliased: Vec<bool> = fit.aliased[offset..].to_vec();
        let fitted_values = linear_predictor(x, &coefficients, &aliased, intercept);
        let residuals = Col::from_fn(n, |i| y[i] - fitted_values[i]);

        let n_params = fit.rank;
        let rank = n_params - usize::from(with_intercept && !fit.aliased[0]);
        let df_resid = n.saturating_sub(n_params) as f64;
        let rss_star: f64 = fit.residuals.iter().map(|r| r * r).sum();
        let mse = if df_resid > 0.0 {
            rss_star / df_resid
        } else {
            f64::NAN
        };
        let sigma = mse.sqrt();

        let y_mean = y.iter().sum::<f64>() / n as f64;
        let tss: f64 = if with_intercept {
            y.iter().map(|v| (v - y_mean).powi(2)).sum()
        } else {
            y.iter().map(|v| v * v).sum()
        };
        let rss: f64 = residuals.iter().map(|r| r * r).sum();
        let r_squared = if tss > 0.0 {
            (1.0 - rss / tss).clamp(0.0, 1.0)
        } else {
            f64::NAN
        };
        let df_total = (n - offset) as f64;

        let mut result = RegressionResult::empty(p, n);
        result.coefficients = coefficients;
        result.intercept = intercept;
        result.residuals = residuals;
        result.fitted_values = fitted_values;
        result.rank = rank;
        result.n_parameters = n_params;
        result.n_observations = n;
        result.aliased = aliased;
        result.rank_tolerance = self.options.rank_tolerance;
        result.r_squared = r_squared;
        result.adj_r_squared = if df_resid > 0.0 {
            1.0 - (1.0 - r_squared) * df_total / df_resid
        } else {
            f64::NAN
        };
        result.mse = mse;
        result.rmse = sigma;
        result.sigma = sigma;
        result.confidence_level = self.options.confidence_level;
        // β, σ² and (when estimated) φ
        let k = n_params + 1 + usize::from(phi_estimated);
        set_information_criteria(&mut result, point.log_likelihood, k);

        let (design_star, _) = prais_winsten(design, y, point.phi);
        let active: Vec<bool> = fit.aliased.iter().map(|&a| !a).collect();
        let xtx_inverse = inverse_cross_product(&design_star, None, &active);

        if let Some(cov) = &xtx_inverse {
            let (f, f_p) = wald_f_test(&fit.coefficients, cov, mse, offset, &active, df_resid);
            result.f_statistic = f;
            result.f_pvalue = f_p;
            if self.options.compute_inference && df_resid > 0.0 && mse.is_finite() {
                CoefficientInference::apply(&mut result, cov, mse, df_resid);
            }
        }

        let normalized_residuals = Col::from_fn(n, |i| fit.residuals[i] / sigma);
        (result, xtx_inverse, normalized_residuals)
    }
}

/// Prais-Winsten transform of the design and response for a given φ.
pub fn prais_winsten(design: &Mat<f64>, y: &Col<f64>, phi: f64) -> (Mat<f64>, Col<f64>) {
    let n = y.nrows();
    let head = (1.0 - phi * phi).sqrt();

    let design_star = Mat::from_fn(n, design.ncols(), |i, j| {
        if i == 0 {
            head * design[(0, j)]
        } else {
            design[(i, j)] - phi * design[(i - 1, j)]
        }
    });
    let y_star = Col::from_fn(n, |i| {
        if i == 0 {
            head * y[0]
        } else {
            y[i] - phi * y[i - 1]
        }
    });

    (design_star, y_star)
}

/// Residuals `y - Dβ` on the original scale for a transformed-scale fit.
fn raw_residuals(design: &Mat<f64>, y: &Col<f64>, fit: &LeastSquaresFit) -> Col<f64> {
    let fitted = linear_predictor(design, &fit.coefficients, &fit.aliased, None);
    Col::from_fn(y.nrows(), |i| y[i] - fitted[i])
}

/// Σ eₜ eₜ₋₁ / Σ eₜ², clamped inside the stationary region.
fn lag_one_coefficient(e: &Col<f64>) -> f64 {
    let num: f64 = (1..e.nrows()).map(|t| e[t] * e[t - 1]).sum();
    let den: f64 = e.iter().map(|v| v * v).sum();
    if den > 0.0 {
        (num / den).clamp(-PHI_BOUND, PHI_BOUND)
    } else {
        0.0
    }
}

/// Wald F test that all slopes are zero.
fn wald_f_test(
    beta: &Col<f64>,
    cov: &Mat<f64>,
    sigma2: f64,
    offset: usize,
    active: &[bool],
    df_resid: f64,
) -> (f64, f64) {
    let slopes: Vec<usize> = (offset..beta.nrows()).filter(|&j| active[j]).collect();
    let q = slopes.len();
    if q == 0 || !(df_resid > 0.0) || !(sigma2 > 0.0) {
        return (f64::NAN, f64::NAN);
    }

    let sub = Mat::from_fn(q, q, |a, b| cov[(slopes[a], slopes[b])]);
    let Some(sub_inv) = invert_symmetric(&sub) else {
        return (f64::NAN, f64::NAN);
    };

    let mut quad = 0.0;
    for a in 0..q {
        for b in 0..q {
            quad += beta[slopes[a]] * sub_inv[(a, b)] * beta[slopes[b]];
        }
    }
    let f = quad / (q as f64 * sigma2);
    let p = FisherSnedecor::new(q as f64, df_resid).map_or(f64::NAN, |d| d.sf(f));
    (f, p)
}

/// A fitted GLS model with AR(1) errors.
#[derive(Debug, Clone)]
pub struct FittedGls {
    options: RegressionOptions,
    result: RegressionResult,
    phi: f64,
    iterations: usize,
    converged: bool,
    /// (X*'X*)⁻¹ of the transformed design
    xtx_inverse: Option<Mat<f64>>,
    normalized_residuals: Col<f64>,
}

impl FittedGls {
    pub fn options(&self) -> &RegressionOptions {
        &self.options
    }

    /// Estimated (or fixed) AR(1) coefficient.
    pub fn phi(&self) -> f64 {
        self.phi
    }

    /// Iterations used to estimate φ (0 when fixed).
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Whether φ estimation converged.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Whitened residuals divided by σ̂; approximately iid N(0, 1) if the model holds.
    pub fn normalized_residuals(&self) -> &Col<f64> {
        &self.normalized_residuals
    }

    /// Forecast the next `x_new.nrows()` periods after the sample.
    ///
    /// Adds the propagated last residual: ŷₙ₊ₕ = xₙ₊ₕ'β + φʰ eₙ.
    pub fn forecast(&self, x_new: &Mat<f64>) -> Col<f64> {
        let base = self.predict(x_new);
        let last = self
            .result
            .residuals
            .iter()
            .last()
            .copied()
            .unwrap_or(0.0);
        Col::from_fn(base.nrows(), |h| base[h] + self.phi.powi(h as i32 + 1) * last)
    }
}

impl FittedRegressor for FittedGls {
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

    /// Intervals use the GLS covariance of β and the innovation variance σ².
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

/// Builder for `GlsRegressor`.
#[derive(Debug, Clone, Default)]
pub struct GlsRegressorBuilder {
    builder: RegressionOptionsBuilder,
    estimation: CorrelationEstimation,
}

impl GlsRegressorBuilder {
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

    /// Set how φ is obtained.
    pub fn estimation(mut self, estimation: CorrelationEstimation) -> Self {
        self.estimation = estimation;
        self
    }

    /// Fix φ instead of estimating it.
    pub fn phi(self, phi: f64) -> Self {
        self.estimation(CorrelationEstimation::Fixed(phi))
    }

    /// Maximum iterations of the φ search.
    pub fn max_iterations(mut self, max_iter: usize) -> Self {
        self.builder = self.builder.max_iterations(max_iter);
        self
    }

    /// Convergence tolerance on φ.
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.builder = self.builder.tolerance(tol);
        self
    }

    pub fn build(self) -> GlsRegressor {
        GlsRegressor::new(self.builder.build_unchecked(), self.estimation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prais_winsten_identity_at_zero() {
        let d = Mat::from_fn(4, 2, |i, j| (i + j) as f64);
        let y = Col::from_fn(4, |i| i as f64 * 2.0);
        let (ds, ys) = prais_winsten(&d, &y, 0.0);
        for i in 0..4 {
            assert_eq!(ys[i], y[i]);
            assert_eq!(ds[(i, 1)], d[(i, 1)]);
        }
    }

    #[test]
    fn test_prais_winsten_differences() {
        let d = Mat::from_fn(3, 1, |_, _| 1.0);
        let y = Col::from_fn(3, |i| (i + 1) as f64);
        let (ds, ys) = prais_winsten(&d, &y, 0.6);
        assert!((ds[(0, 0)] - 0.8).abs() < 1e-12);
        assert!((ds[(1, 0)] - 0.4).abs() < 1e-12);
        assert!((ys[0] - 0.8).abs() < 1e-12);
        assert!((ys[2] - (3.0 - 0.6 * 2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_lag_one_coefficient() {
        let e = Col::from_fn(4, |i| if i % 2 == 0 { 1.0 } else { -1.0 });
        assert!((lag_one_coefficient(&e) + 0.75).abs() < 1e-12);
        assert_eq!(lag_one_coefficient(&Col::zeros(3)), 0.0);
    }

    #[test]
    fn test_fixed_phi_out_of_range() {
        let x = Mat::from_fn(10, 1, |i, _| i as f64);
        let y = Col::from_fn(10, |i| i as f64);
        let model = GlsRegressor::builder().phi(1.0).build();
        assert!(matches!(
            model.fit(&x, &y),
            Err(RegressionError::InvalidOptions(
                OptionsError::InvalidAutocorrelation(_)
            ))
        ));
    }
}

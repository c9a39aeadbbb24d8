//! Quantile regression (least absolute deviations at τ = 0.5).
//!
//! Minimizes Σ ρ_τ(yᵢ - xᵢ'β) with the check loss `ρ_τ(u) = u (τ - 1{u < 0})`.
//! The problem is solved exactly as the linear program
//!
//! ```text
//! min  τ 1'u + (1 - τ) 1'v
//! s.t. X b⁺ - X b⁻ + u - v = y,   b⁺, b⁻, u, v ≥ 0
//! ```
//!
//! with a dense tableau simplex under Bland's rule. Rows with negative
//! response are negated so the slack columns form the starting basis.

use crate::core::{
    IntervalType, OptionsError, PredictionResult, RegressionOptions, RegressionOptionsBuilder,
    RegressionResult,
};
use crate::inference::CoefficientInference;
use crate::solvers::linear::{
    linear_predictor, set_information_criteria, solve_least_squares, unscaled_covariance,
    validate_data, LeastSquaresFit,
};
use crate::solvers::traits::{FittedRegressor, RegressionError, Regressor};
use crate::utils::argsort;
use faer::{Col, Mat};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use tracing::debug;

const PIVOT_EPS: f64 = 1e-10;

/// Check loss ρ_τ(u).
pub fn check_loss(u: f64, tau: f64) -> f64 {
    if u < 0.0 {
        u * (tau - 1.0)
    } else {
        u * tau
    }
}

/// Hall-Sheather bandwidth for the sparsity estimate (α = 0.05).
pub fn hall_sheather_bandwidth(tau: f64, n: usize) -> f64 {
    let Ok(normal) = Normal::new(0.0, 1.0) else {
        return f64::NAN;
    };
    let x0 = normal.inverse_cdf(tau);
    let f0 = normal.pdf(x0);
    let z = normal.inverse_cdf(0.975);
    (n as f64).powf(-1.0 / 3.0)
        * z.powf(2.0 / 3.0)
        * (1.5 * f0 * f0 / (2.0 * x0 * x0 + 1.0)).powf(1.0 / 3.0)
}

/// Solve the check-loss LP for the given design (intercept column included
/// if wanted). Returns β.
fn solve_check_loss(design: &Mat<f64>, y: &Col<f64>, tau: f64) -> Result<Vec<f64>, RegressionError> {
    let n = design.nrows();
    let q = design.ncols();
    let m = 2 * q + 2 * n;
    let width = m + 1;
    let cost = |j: usize| {
        if j < 2 * q {
            0.0
        } else if j < 2 * q + n {
            tau
        } else {
            1.0 - tau
        }
    };

    // Rows 0..n are constraints, row n holds the reduced costs
    let mut t = vec![0.0; (n + 1) * width];
    let mut basis = vec![0usize; n];
    for i in 0..n {
        let sign = if y[i] < 0.0 { -1.0 } else { 1.0 };
        let row = i * width;
        for j in 0..q {
            t[row + j] = sign * design[(i, j)];
            t[row + q + j] = -sign * design[(i, j)];
        }
        t[row + 2 * q + i] = sign;
        t[row + 2 * q + n + i] = -sign;
        t[row + m] = sign * y[i];
        basis[i] = if sign > 0.0 { 2 * q + i } else { 2 * q + n + i };
    }
    for j in 0..width {
        let mut r = if j < m { cost(j) } else { 0.0 };
        for i in 0..n {
            r -= cost(basis[i]) * t[i * width + j];
        }
        t[n * width + j] = r;
    }

    let max_pivots = 50 * (n + m);
    let mut pivots = 0;
    loop {
        // Bland: lowest-index improving column
        let Some(entering) = (0..m).find(|&j| t[n * width + j] < -PIVOT_EPS) else {
            break;
        };

        let mut leaving: Option<(usize, f64)> = None;
        for i in 0..n {
            let a = t[i * width + entering];
            if a <= PIVOT_EPS {
                continue;
            }
            let ratio = t[i * width + m] / a;
            leaving = match leaving {
                Some((r, best))
                    if ratio > best + 1e-12 * (1.0 + best.abs())
                        || (ratio >= best - 1e-12 * (1.0 + best.abs())
                            && basis[r] < basis[i]) =>
                {
                    Some((r, best))
                }
                _ => Some((i, ratio)),
            };
        }
        let Some((pivot_row, _)) = leaving else {
            return Err(RegressionError::NumericalError(
                "quantile program is unbounded".to_string(),
            ));
        };

        let p = t[pivot_row * width + entering];
        for j in 0..width {
            t[pivot_row * width + j] /= p;
        }
        for i in 0..=n {
            if i == pivot_row {
                continue;
            }
            let factor = t[i * width + entering];
            if factor != 0.0 {
                for j in 0..width {
                    t[i * width + j] -= factor * t[pivot_row * width + j];
                }
            }
        }
        basis[pivot_row] = entering;

        pivots += 1;
        if pivots > max_pivots {
            return Err(RegressionError::NumericalError(format!(
                "simplex exceeded {max_pivots} pivots"
            )));
        }
    }
    debug!(pivots, tau, n, "quantile simplex finished");

    let mut beta = vec![0.0; q];
    for (i, &var) in basis.iter().enumerate() {
        let value = t[i * width + m];
        if var < q {
            beta[var] += value;
        } else if var < 2 * q {
            beta[var - q] -= value;
        }
    }
    Ok(beta)
}

/// Quantile regression estimator.
///
/// # Example
///
/// ```rust,ignore
/// use regression_remedies::solvers::{QuantileRegressor, Regressor};
///
/// // Least absolute deviations
/// let lad = QuantileRegressor::builder().tau(0.5).build().fit(&x, &y)?;
/// println!("pseudo R1 = {}", lad.pseudo_r_squared());
/// ```
#[derive(Debug, Clone)]
pub struct QuantileRegressor {
    options: RegressionOptions,
    tau: f64,
}

impl QuantileRegressor {
    /// Create a new quantile regressor.
    pub fn new(options: RegressionOptions, tau: f64) -> Self {
        Self { options, tau }
    }

    pub fn builder() -> QuantileRegressorBuilder {
        QuantileRegressorBuilder::default()
    }

    /// Quantile being estimated.
    pub fn tau(&self) -> f64 {
        self.tau
    }

    /// Sparsity s = 1/f(F⁻¹(τ)) from the "iid" difference-quotient method.
    ///
    /// The h+1 residuals smallest in absolute value (exact zeros skipped)
    /// are sorted and regressed on their ranks by median regression. The
    /// slope estimates the sparsity.
    fn sparsity(&self, residuals: &Col<f64>, p: usize) -> Option<f64> {
        let n = residuals.nrows();
        if n <= p + 1 {
            return None;
        }
        let zero_eps = f64::EPSILON.powf(2.0 / 3.0);
        let abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
        let zeros = abs.iter().filter(|&&a| a < zero_eps).count();
        let h = ((n as f64 * hall_sheather_bandwidth(self.tau, n)).ceil() as usize).max(p + 1);

        let last = (h + zeros).min(n - 1);
        if last <= zeros {
            return None;
        }
        let order = argsort(&abs);
        let mut ordered: Vec<f64> = order[zeros..=last].iter().map(|&i| residuals[i]).collect();
        ordered.sort_by(|a, b| a.total_cmp(b));

        // ranks are 1-based
        let design = Mat::from_fn(ordered.len(), 2, |i, j| {
            if j == 0 {
                1.0
            } else {
                (zeros + i + 1) as f64 / (n - p) as f64
            }
        });
        let response = Col::from_fn(ordered.len(), |i| ordered[i]);
        let slope = solve_check_loss(&design, &response, 0.5).ok()?[1];
        (slope > 0.0 && slope.is_finite()).then_some(slope)
    }
}

impl Regressor for QuantileRegressor {
    type Fitted = FittedQuantile;

    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError> {
        self.options.validate()?;
        if !(self.tau > 0.0 && self.tau < 1.0) {
            return Err(OptionsError::InvalidQuantile(self.tau).into());
        }
        validate_data(x, y, self.options.with_intercept)?;
        let n = x.nrows();
        let n_features = x.ncols();
        let with_intercept = self.options.with_intercept;

        // Aliasing is decided by the least squares core so both agree
        let ls = solve_least_squares(x, y, None, with_intercept, self.options.rank_tolerance)?;
        let active: Vec<usize> = (0..n_features).filter(|&j| !ls.aliased[j]).collect();
        let offset = usize::from(with_intercept);
        let design = Mat::from_fn(n, offset + active.len(), |i, j| {
            if j < offset {
                1.0
            } else {
                x[(i, active[j - offset])]
            }
        });

        let beta = solve_check_loss(&design, y, self.tau)?;

        let mut coefficients = Col::from_fn(n_features, |_| f64::NAN);
        for (k, &j) in active.iter().enumerate() {
            coefficients[j] = beta[offset + k];
        }
        let intercept = with_intercept.then(|| beta[0]);
        let fitted_values = linear_predictor(x, &coefficients, &ls.aliased, intercept);
        let residuals = Col::from_fn(n, |i| y[i] - fitted_values[i]);

        let fit = LeastSquaresFit {
            coefficients,
            intercept,
            aliased: ls.aliased.clone(),
            rank: active.len(),
            fitted_values,
            residuals,
        };
        let n_params = fit.n_params();

        let objective: f64 = fit.residuals.iter().map(|&r| check_loss(r, self.tau)).sum();
        let baseline = intercept_only_loss(y, self.tau);
        let pseudo_r_squared = if baseline > 0.0 {
            1.0 - objective / baseline
        } else {
            f64::NAN
        };

        let mut result = RegressionResult::empty(n_features, n);
        result.coefficients = fit.coefficients.clone();
        result.intercept = fit.intercept;
        result.residuals = fit.residuals.clone();
        result.fitted_values = fit.fitted_values.clone();
        result.rank = fit.rank;
        result.n_parameters = n_params;
        result.aliased = fit.aliased.clone();
        result.rank_tolerance = self.options.rank_tolerance;
        result.r_squared = pseudo_r_squared;
        result.adj_r_squared = f64::NAN;
        result.mse = f64::NAN;
        result.rmse = f64::NAN;
        result.f_statistic = f64::NAN;
        result.f_pvalue = f64::NAN;
        result.confidence_level = self.options.confidence_level;

        // Asymmetric Laplace log-likelihood, as R's logLik.rq
        let nf = n as f64;
        let log_likelihood = if objective > 0.0 {
            nf * ((self.tau * (1.0 - self.tau)).ln() - 1.0 - (objective / nf).ln())
        } else {
            f64::NAN
        };
        set_information_criteria(&mut result, log_likelihood, n_params);

        let mut sparsity = None;
        if self.options.compute_inference && n > n_params {
            sparsity = self.sparsity(&fit.residuals, n_params);
            if let (Some(s), Some(cov)) = (sparsity, unscaled_covariance(x, None, &fit)) {
                let sigma2 = s * s * self.tau * (1.0 - self.tau);
                CoefficientInference::apply(&mut result, &cov, sigma2, (n - n_params) as f64);
            }
        }
        result.sigma = sparsity.map_or(f64::NAN, |s| s * (self.tau * (1.0 - self.tau)).sqrt());

        Ok(FittedQuantile {
            options: self.options.clone(),
            tau: self.tau,
            result,
            objective,
            pseudo_r_squared,
            sparsity,
        })
    }
}

/// Check loss of the best constant fit (the sample τ-quantile).
fn intercept_only_loss(y: &Col<f64>, tau: f64) -> f64 {
    let mut sorted: Vec<f64> = y.iter().copied().collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let k = ((n as f64 * tau).ceil() as usize).clamp(1, n) - 1;
    let q = sorted[k];
    y.iter().map(|&v| check_loss(v - q, tau)).sum()
}

/// A fitted quantile regression model.
#[derive(Debug, Clone)]
pub struct FittedQuantile {
    options: RegressionOptions,
    tau: f64,
    result: RegressionResult,
    objective: f64,
    pseudo_r_squared: f64,
    sparsity: Option<f64>,
}

impl FittedQuantile {
    pub fn options(&self) -> &RegressionOptions {
        &self.options
    }

    /// Quantile that was estimated.
    pub fn tau(&self) -> f64 {
        self.tau
    }

    /// Minimized check loss Σ ρ_τ(rᵢ).
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Koenker-Machado R¹: `1 - V(τ) / Ṽ(τ)` against the intercept-only fit.
    pub fn pseudo_r_squared(&self) -> f64 {
        self.pseudo_r_squared
    }

    /// Estimated sparsity 1/f(F⁻¹(τ)), if inference was computed.
    pub fn sparsity(&self) -> Option<f64> {
        self.sparsity
    }

    /// Rows fitted exactly (|r| below `tol`).
    pub fn interpolated(&self, tol: f64) -> Vec<usize> {
        self.result
            .residuals
            .iter()
            .enumerate()
            .filter(|(_, r)| r.abs() < tol)
            .map(|(i, _)| i)
            .collect()
    }
}

impl FittedRegressor for FittedQuantile {
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

    /// Bounds are NaN; no interval theory is provided for quantile fits.
    fn predict_with_interval(
        &self,
        x: &Mat<f64>,
        interval: Option<IntervalType>,
        _level: f64,
    ) -> PredictionResult {
        let predictions = self.predict(x);
        match interval {
            None => PredictionResult::point_only(predictions),
            Some(interval_type) => PredictionResult::unavailable(predictions, interval_type),
        }
    }
}

/// Builder for `QuantileRegressor`.
#[derive(Debug, Clone)]
pub struct QuantileRegressorBuilder {
    builder: RegressionOptionsBuilder,
    tau: f64,
}

impl Default for QuantileRegressorBuilder {
    fn default() -> Self {
        Self {
            builder: RegressionOptionsBuilder::default(),
            tau: 0.5,
        }
    }
}

impl QuantileRegressorBuilder {
    /// Create a new builder (median regression).
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

    /// Quantile τ in (0, 1).
    pub fn tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }

    pub fn build(self) -> QuantileRegressor {
        QuantileRegressor::new(self.builder.build_unchecked(), self.tau)
    }
}

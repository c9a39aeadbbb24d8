//! Least trimmed squares (FAST-LTS).
//!
//! Minimizes the sum of the h smallest squared residuals. Random elemental
//! subsets are concentrated with C-steps (refit on the h rows with the
//! smallest residuals), which never increase the objective. The raw fit is
//! then reweighted: rows with |r/s| above the cutoff get weight zero and the
//! reported model is least squares on the remaining rows.

use crate::core::{
    IntervalType, OptionsError, PredictionResult, RegressionOptions, RegressionOptionsBuilder,
    RegressionResult,
};
use crate::inference::compute_prediction_intervals;
use crate::solvers::linear::{
    build_result, linear_predictor, solve_least_squares, unscaled_covariance, validate_data,
    LeastSquaresFit,
};
use crate::solvers::traits::{FittedRegressor, RegressionError, Regressor};
use crate::utils::{argsort, select_entries, select_rows};
use faer::{Col, Mat};
use rand::prelude::*;
use rayon::prelude::*;
use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use tracing::debug;

/// Number of best starts refined to convergence.
const REFINED_STARTS: usize = 10;
/// C-steps applied to every random start before selection.
const INITIAL_C_STEPS: usize = 2;

/// Least trimmed squares regressor.
///
/// # Example
///
/// ```rust,ignore
/// use regression_remedies::solvers::{LtsRegressor, Regressor};
///
/// let fitted = LtsRegressor::builder().coverage(0.75).seed(7).build().fit(&x, &y)?;
/// println!("outliers: {:?}", fitted.outliers());
/// ```
#[derive(Debug, Clone)]
pub struct LtsRegressor {
    options: RegressionOptions,
    coverage: f64,
    n_starts: usize,
    seed: u64,
    cutoff: f64,
}

impl LtsRegressor {
    pub fn builder() -> LtsRegressorBuilder {
        LtsRegressorBuilder::default()
    }

    /// Number of rows kept in the trimmed objective.
    ///
    /// With coverage α this is `2⌊(n+p+1)/2⌋ - n + 2(n - ⌊(n+p+1)/2⌋)α`,
    /// which equals ⌊(n+p+1)/2⌋ at α = 0.5 and n at α = 1.
    pub fn subset_size(&self, n: usize, p: usize) -> usize {
        let half = (n + p + 1) / 2;
        let h = (2 * half) as f64 - n as f64 + 2.0 * (n - half) as f64 * self.coverage;
        (h.floor() as usize).clamp(half, n)
    }

    fn solve(&self, x: &Mat<f64>, y: &Col<f64>) -> Option<LeastSquaresFit> {
        solve_least_squares(
            x,
            y,
            None,
            self.options.with_intercept,
            self.options.rank_tolerance,
        )
        .ok()
    }

    /// Fit on the given rows and rank all rows by squared residual.
    fn candidate(&self, x: &Mat<f64>, y: &Col<f64>, rows: &[usize], h: usize) -> Option<Candidate> {
        let fit = self.solve(&select_rows(x, rows), &select_entries(y, rows))?;
        if fit.aliased.iter().any(|&a| a) {
            return None;
        }

        let predicted = fit.predict(x);
        let squared: Vec<f64> = (0..x.nrows())
            .map(|i| (y[i] - predicted[i]).powi(2))
            .collect();
        let mut subset: Vec<usize> = argsort(&squared).into_iter().take(h).collect();
        let objective = subset.iter().map(|&i| squared[i]).sum();
        subset.sort_unstable();

        Some(Candidate {
            fit,
            subset,
            objective,
        })
    }

    fn c_step(&self, x: &Mat<f64>, y: &Col<f64>, current: &Candidate, h: usize) -> Option<Candidate> {
        self.candidate(x, y, &current.subset, h)
    }

    /// Iterate C-steps until the objective stops decreasing.
    fn refine(&self, x: &Mat<f64>, y: &Col<f64>, mut current: Candidate, h: usize) -> Candidate {
        for step in 0..self.options.max_iterations {
            let Some(next) = self.c_step(x, y, &current, h) else {
                break;
            };
            let improvement = current.objective - next.objective;
            debug!(step, objective = next.objective, improvement, "C-step");

            let done = next.subset == current.subset
                || improvement <= self.options.tolerance * current.objective;
            if next.objective <= current.objective {
                current = next;
            }
            if done {
                break;
            }
        }
        current
    }
}

/// One concentrated start: the fit, its h best rows and their squared sum.
#[derive(Debug, Clone)]
struct Candidate {
    fit: LeastSquaresFit,
    subset: Vec<usize>,
    objective: f64,
}

/// `1 / √(1 - 2n q φ(q) / h)` with `q = Φ⁻¹((h + n) / 2n)`.
///
/// Makes the trimmed scale consistent for σ under normal errors.
pub fn lts_consistency_factor(n: usize, h: usize) -> f64 {
    let Ok(normal) = Normal::new(0.0, 1.0) else {
        return 1.0;
    };
    let (n, h) = (n as f64, h as f64);
    let q = normal.inverse_cdf((h + n) / (2.0 * n));
    if !q.is_finite() {
        return 1.0;
    }
    let trimmed = 1.0 - 2.0 * n * q * normal.pdf(q) / h;
    if trimmed > 0.0 {
        1.0 / trimmed.sqrt()
    } else {
        1.0
    }
}

impl Regressor for LtsRegressor {
    type Fitted = FittedLts;

    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError> {
        self.options.validate()?;
        if !(0.5..=1.0).contains(&self.coverage) {
            return Err(OptionsError::InvalidCoverage(self.coverage).into());
        }
        if self.n_starts == 0 {
            return Err(OptionsError::InvalidStarts.into());
        }
        if !(self.cutoff.is_finite() && self.cutoff > 0.0) {
            return Err(OptionsError::InvalidCutoff(self.cutoff).into());
        }
        validate_data(x, y, self.options.with_intercept)?;

        let n = x.nrows();
        let p = x.ncols() + usize::from(self.options.with_intercept);
        if n <= p {
            return Err(RegressionError::InsufficientObservations {
                needed: p + 1,
                got: n,
            });
        }
        let h = self.subset_size(n, p);

        let mut master = StdRng::seed_from_u64(self.seed);
        let seeds: Vec<u64> = (0..self.n_starts).map(|_| master.gen()).collect();

        let mut starts: Vec<Candidate> = seeds
            .par_iter()
            .filter_map(|&seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let rows = rand::seq::index::sample(&mut rng, n, p).into_vec();
                let mut current = self.candidate(x, y, &rows, h)?;
                for _ in 0..INITIAL_C_STEPS {
                    match self.c_step(x, y, &current, h) {
                        Some(next) if next.objective <= current.objective => current = next,
                        _ => break,
                    }
                }
                Some(current)
            })
            .collect();

        if starts.is_empty() {
            return Err(RegressionError::SingularMatrix);
        }
        debug!(usable = starts.len(), requested = self.n_starts, h, "LTS starts");

        starts.sort_by(|a, b| a.objective.total_cmp(&b.objective));
        starts.truncate(REFINED_STARTS);

        let best = starts
            .into_iter()
            .map(|start| self.refine(x, y, start, h))
            .min_by(|a, b| a.objective.total_cmp(&b.objective))
            .ok_or(RegressionError::SingularMatrix)?;

        let raw_scale = (best.objective / h as f64).sqrt() * lts_consistency_factor(n, h);
        let raw_fitted = best.fit.predict(x);
        let raw_residuals = Col::from_fn(n, |i| y[i] - raw_fitted[i]);

        // An exact fit of h rows leaves no spread; flag anything off that fit
        let floor = 1e-10 * y.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
        let threshold = (self.cutoff * raw_scale).max(floor);
        let weights = Col::from_fn(n, |i| {
            if raw_residuals[i].abs() <= threshold {
                1.0
            } else {
                0.0
            }
        });
        let kept = weights.iter().filter(|&&w| w > 0.0).count();
        debug!(raw_scale, kept, "LTS reweighting");
        if kept < p {
            return Err(RegressionError::InsufficientObservations {
                needed: p,
                got: kept,
            });
        }

        let fit = solve_least_squares(
            x,
            y,
            Some(&weights),
            self.options.with_intercept,
            self.options.rank_tolerance,
        )?;
        let result = build_result(x, y, Some(&weights), &fit, &self.options);
        let xtwx_inverse = unscaled_covariance(x, Some(&weights), &fit);

        Ok(FittedLts {
            options: self.options.clone(),
            result,
            raw_coefficients: best.fit.coefficients.clone(),
            raw_intercept: best.fit.intercept,
            raw_scale,
            best_subset: best.subset,
            weights,
            xtwx_inverse,
        })
    }
}

/// A fitted LTS model (reweighted least squares on the retained rows).
#[derive(Debug, Clone)]
pub struct FittedLts {
    options: RegressionOptions,
    result: RegressionResult,
    raw_coefficients: Col<f64>,
    raw_intercept: Option<f64>,
    raw_scale: f64,
    best_subset: Vec<usize>,
    weights: Col<f64>,
    xtwx_inverse: Option<Mat<f64>>,
}

impl FittedLts {
    pub fn options(&self) -> &RegressionOptions {
        &self.options
    }

    /// Slope coefficients of the raw (unreweighted) LTS fit.
    pub fn raw_coefficients(&self) -> &Col<f64> {
        &self.raw_coefficients
    }

    /// Intercept of the raw LTS fit.
    pub fn raw_intercept(&self) -> Option<f64> {
        self.raw_intercept
    }

    /// Consistency-corrected scale of the raw fit.
    pub fn raw_scale(&self) -> f64 {
        self.raw_scale
    }

    /// The h rows that define the raw fit, ascending.
    pub fn best_subset(&self) -> &[usize] {
        &self.best_subset
    }

    /// Reweighting weights (1 kept, 0 flagged).
    pub fn weights(&self) -> &Col<f64> {
        &self.weights
    }

    /// Rows flagged as outliers by the raw fit.
    pub fn outliers(&self) -> Vec<usize> {
        self.weights
            .iter()
            .enumerate()
            .filter(|(_, &w)| w == 0.0)
            .map(|(i, _)| i)
            .collect()
    }
}

impl FittedRegressor for FittedLts {
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
            self.xtwx_inverse.as_ref(),
            &self.result,
            interval,
            level,
        )
    }
}

/// Builder for `LtsRegressor`.
#[derive(Debug, Clone)]
pub struct LtsRegressorBuilder {
    builder: RegressionOptionsBuilder,
    coverage: f64,
    n_starts: usize,
    seed: u64,
    cutoff: f64,
}

impl Default for LtsRegressorBuilder {
    fn default() -> Self {
        Self {
            builder: RegressionOptionsBuilder::default(),
            coverage: 0.5,
            n_starts: 500,
            seed: 0,
            cutoff: 2.5,
        }
    }
}

impl LtsRegressorBuilder {
    /// Create a new builder (coverage 0.5, 500 starts, seed 0).
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

    /// Fraction α in [0.5, 1] controlling the trimmed subset size.
    pub fn coverage(mut self, alpha: f64) -> Self {
        self.coverage = alpha;
        self
    }

    /// Number of random elemental starts.
    pub fn n_starts(mut self, n_starts: usize) -> Self {
        self.n_starts = n_starts;
        self
    }

    /// Seed for subset sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Standardized residual cutoff for reweighting (default 2.5).
    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Maximum C-steps when refining the best starts.
    pub fn max_iterations(mut self, max_iter: usize) -> Self {
        self.builder = self.builder.max_iterations(max_iter);
        self
    }

    pub fn build(self) -> LtsRegressor {
        LtsRegressor {
            options: self.builder.build_unchecked(),
            coverage: self.coverage,
            n_starts: self.n_starts,
            seed: self.seed,
            cutoff: self.cutoff,
        }
    }
}

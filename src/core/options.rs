//! Fit settings common to every estimator, and the errors raised when a
//! setting is out of range.

use thiserror::Error;

/// Settings read by every estimator.
///
/// Estimator-specific knobs (weights, ψ, τ, φ, coverage) live on the
/// estimator's own builder.
#[derive(Debug, Clone)]
pub struct RegressionOptions {
    pub with_intercept: bool,
    /// Produce standard errors, t tests and coefficient intervals.
    pub compute_inference: bool,
    pub confidence_level: f64,
    /// Cap on IRLS steps, LTS C-steps, Prais-Winsten rounds and simplex pivots
    /// per phase, whichever applies.
    pub max_iterations: usize,
    /// Stopping threshold on the relative change between iterates.
    pub tolerance: f64,
    /// Relative tolerance used to declare a column aliased.
    pub rank_tolerance: f64,
}

impl Default for RegressionOptions {
    fn default() -> Self {
        Self {
            with_intercept: true,
            compute_inference: true,
            confidence_level: 0.95,
            max_iterations: 50,
            tolerance: 1e-6,
            rank_tolerance: 1e-7,
        }
    }
}

/// An option or estimator parameter outside its domain.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("confidence_level must be in (0, 1), got {0}")]
    InvalidConfidenceLevel(f64),
    #[error("tolerance must be positive, got {0}")]
    InvalidTolerance(f64),
    #[error("rank_tolerance must be positive, got {0}")]
    InvalidRankTolerance(f64),
    #[error("max_iterations must be at least 1, got {0}")]
    InvalidMaxIterations(usize),
    #[error("quantile must be in (0, 1), got {0}")]
    InvalidQuantile(f64),
    #[error("tuning constant must be positive and finite, got {0}")]
    InvalidTuningConstant(f64),
    #[error("Hampel constants must satisfy 0 < a <= b < c, got ({0}, {1}, {2})")]
    InvalidHampelConstants(f64, f64, f64),
    #[error("coverage must be in [0.5, 1], got {0}")]
    InvalidCoverage(f64),
    #[error("autocorrelation must be in (-1, 1), got {0}")]
    InvalidAutocorrelation(f64),
    #[error("number of random starts must be at least 1")]
    InvalidStarts,
    #[error("reweighting cutoff must be positive and finite, got {0}")]
    InvalidCutoff(f64),
}

impl RegressionOptions {
    pub fn builder() -> RegressionOptionsBuilder {
        RegressionOptionsBuilder::default()
    }

    /// The `MASS::rlm` defaults: at most 20 IRLS steps, stop below 1e-4.
    pub fn robust() -> Self {
        Self {
            max_iterations: 20,
            tolerance: 1e-4,
            ..Default::default()
        }
    }

    /// NaN fails every check.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(OptionsError::InvalidConfidenceLevel(self.confidence_level));
        }
        if !(self.tolerance > 0.0) {
            return Err(OptionsError::InvalidTolerance(self.tolerance));
        }
        if !(self.rank_tolerance > 0.0) {
            return Err(OptionsError::InvalidRankTolerance(self.rank_tolerance));
        }
        if self.max_iterations < 1 {
            return Err(OptionsError::InvalidMaxIterations(self.max_iterations));
        }
        Ok(())
    }
}

/// Builder for [`RegressionOptions`].
#[derive(Debug, Clone, Default)]
pub struct RegressionOptionsBuilder {
    options: RegressionOptions,
}

impl RegressionOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the builder with another preset, such as [`RegressionOptions::robust`].
    pub fn from_options(options: RegressionOptions) -> Self {
        Self { options }
    }

    pub fn with_intercept(mut self, include: bool) -> Self {
        self.options.with_intercept = include;
        self
    }

    pub fn compute_inference(mut self, compute: bool) -> Self {
        self.options.compute_inference = compute;
        self
    }

    pub fn confidence_level(mut self, level: f64) -> Self {
        self.options.confidence_level = level;
        self
    }

    pub fn max_iterations(mut self, max_iter: usize) -> Self {
        self.options.max_iterations = max_iter;
        self
    }

    pub fn tolerance(mut self, tol: f64) -> Self {
        self.options.tolerance = tol;
        self
    }

    pub fn rank_tolerance(mut self, tol: f64) -> Self {
        self.options.rank_tolerance = tol;
        self
    }

    pub fn build(self) -> Result<RegressionOptions, OptionsError> {
        self.options.validate()?;
        Ok(self.options)
    }

    /// Skip validation. The estimator builders use this and defer the check
    /// to `fit`, which keeps their `build` infallible.
    pub fn build_unchecked(self) -> RegressionOptions {
        self.options
    }
}

//! The fitted-model record shared by every estimator.

use faer::Col;

/// Everything an estimator reports about a fit.
///
/// Statistics an estimator has no theory for are NaN, such as the
/// log-likelihood of an M-estimate or the F statistic of a quantile fit. Inference
/// fields are `None` when `compute_inference` is off or the covariance is
/// singular.
#[derive(Debug, Clone)]
pub struct RegressionResult {
    // ========== Estimates ==========
    /// Slope estimates in the column order of `x`; NaN where aliased.
    pub coefficients: Col<f64>,

    /// Intercept, when the model has one.
    pub intercept: Option<f64>,

    /// Raw residuals `y - ŷ` on the original scale.
    pub residuals: Col<f64>,

    /// In-sample fitted values.
    pub fitted_values: Col<f64>,

    /// Observation weights used by the final least squares step.
    ///
    /// `None` for unweighted fits. Robust estimators store their final IRLS
    /// weights here.
    pub weights: Option<Col<f64>>,

    // ========== Rank ==========
    /// Number of estimable slope columns.
    pub rank: usize,

    /// Estimated location parameters, intercept included.
    pub n_parameters: usize,

    /// Rows that entered the fit (positive weight).
    pub n_observations: usize,

    /// Per column of `x`: dropped because it is a linear combination of earlier columns.
    pub aliased: Vec<bool>,

    /// Relative tolerance that decided aliasing.
    pub rank_tolerance: f64,

    // Goodness of fit
    /// R², weighted when the fit is. Pseudo-R¹ (Koenker-Machado) for quantile fits.
    pub r_squared: f64,

    /// R² penalized for the slope count.
    pub adj_r_squared: f64,

    /// `sqrt(mse)`.
    pub rmse: f64,

    /// Residual variance `Σ wᵢ eᵢ² / (n - p)`.
    pub mse: f64,

    /// Overall F statistic against the intercept-only model.
    pub f_statistic: f64,

    pub f_pvalue: f64,

    // Likelihood
    /// `-2 logLik + 2k`, where k counts location parameters, the error
    /// variance, and φ for AR(1) fits.
    pub aic: f64,

    /// AIC with the small-sample correction; NaN when `n - k - 1 <= 0`.
    pub aicc: f64,

    /// `-2 logLik + k ln(n)`.
    pub bic: f64,

    /// Gaussian log-likelihood at the ML variance, weights included.
    pub log_likelihood: f64,

    /// Scale estimate reported by the estimator.
    ///
    /// Residual standard error for least squares fits, the robust scale for
    /// M-estimators and LTS, and NaN where no scale is defined.
    pub sigma: f64,

    // Coefficient inference, per slope and for the intercept
    pub std_errors: Option<Col<f64>>,
    pub intercept_std_error: Option<f64>,
    pub t_statistics: Option<Col<f64>>,
    pub intercept_t_statistic: Option<f64>,
    /// Two-sided p-values from the t distribution with `residual_df` degrees.
    pub p_values: Option<Col<f64>>,
    pub intercept_p_value: Option<f64>,
    pub conf_interval_lower: Option<Col<f64>>,
    pub conf_interval_upper: Option<Col<f64>>,
    pub intercept_conf_interval: Option<(f64, f64)>,

    /// Level of the coefficient intervals above.
    pub confidence_level: f64,
}

impl RegressionResult {
    /// Zeroed result sized for `n_features` columns and `n_observations` rows.
    pub(crate) fn empty(n_features: usize, n_observations: usize) -> Self {
        Self {
            coefficients: Col::zeros(n_features),
            intercept: None,
            residuals: Col::zeros(n_observations),
            fitted_values: Col::zeros(n_observations),
            weights: None,
            rank: 0,
            n_parameters: 0,
            n_observations,
            aliased: vec![false; n_features],
            rank_tolerance: 1e-7,
            r_squared: 0.0,
            adj_r_squared: 0.0,
            rmse: 0.0,
            mse: 0.0,
            f_statistic: 0.0,
            f_pvalue: 1.0,
            aic: 0.0,
            aicc: 0.0,
            bic: 0.0,
            log_likelihood: 0.0,
            sigma: f64::NAN,
            std_errors: None,
            intercept_std_error: None,
            t_statistics: None,
            intercept_t_statistic: None,
            p_values: None,
            intercept_p_value: None,
            conf_interval_lower: None,
            conf_interval_upper: None,
            intercept_conf_interval: None,
            confidence_level: 0.95,
        }
    }

    /// Residual degrees of freedom (n - p), with n counting rows of positive weight.
    pub fn residual_df(&self) -> usize {
        self.n_observations.saturating_sub(self.n_parameters)
    }

    /// Numerator degrees of freedom of the overall F test.
    pub fn model_df(&self) -> usize {
        if self.intercept.is_some() {
            self.n_parameters.saturating_sub(1)
        } else {
            self.n_parameters
        }
    }

    /// Whether any predictor column was dropped as collinear.
    pub fn has_aliased(&self) -> bool {
        self.aliased.iter().any(|&a| a)
    }

    /// Unweighted residual sum of squares.
    pub fn rss(&self) -> f64 {
        self.residuals.iter().map(|&r| r * r).sum()
    }

    /// Σ wᵢ eᵢ², the quantity minimized by the final least squares step.
    pub fn weighted_rss(&self) -> f64 {
        match &self.weights {
            Some(w) => self
                .residuals
                .iter()
                .zip(w.iter())
                .map(|(&r, &wi)| wi * r * r)
                .sum(),
            None => self.rss(),
        }
    }

    /// Total sum of squares of `y = ŷ + e`, weighted when the fit is.
    ///
    /// Centered at the weighted mean with an intercept, about zero without
    /// one (the `summary.lm` convention).
    pub fn tss(&self) -> f64 {
        let w = |i: usize| self.weights.as_ref().map_or(1.0, |w| w[i]);
        let y = |i: usize| self.fitted_values[i] + self.residuals[i];
        let n = self.residuals.nrows();
        let center = match self.intercept {
            Some(_) => {
                let sum_w: f64 = (0..n).map(w).sum();
                (0..n).map(|i| w(i) * y(i)).sum::<f64>() / sum_w
            }
            None => 0.0,
        };
        (0..n).map(|i| w(i) * (y(i) - center).powi(2)).sum()
    }

    /// Explained sum of squares, `tss - weighted_rss`.
    pub fn ess(&self) -> f64 {
        self.tss() - self.weighted_rss()
    }

    /// Slope `j`, or `None` when it is out of range or aliased.
    pub fn get_coefficient(&self, j: usize) -> Option<f64> {
        (j < self.coefficients.nrows() && !self.aliased[j]).then(|| self.coefficients[j])
    }

    /// Estimated coefficients, intercept included, aliased columns excluded.
    pub fn n_active_coefficients(&self) -> usize {
        self.aliased.iter().filter(|&&a| !a).count() + usize::from(self.intercept.is_some())
    }
}

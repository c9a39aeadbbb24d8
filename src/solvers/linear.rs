//! Weighted least squares core shared by every estimator.
//!
//! The centered, weighted design goes through faer's Householder QR with the
//! columns in their original order. A column whose `|R_jj|` falls below
//! `rank_tolerance` times its own norm is aliased and the factorization is
//! redone without it, so the later of two collinear columns is the one
//! dropped, as in R's `lm`.

use crate::core::{RegressionOptions, RegressionResult};
use crate::inference::CoefficientInference;
use crate::solvers::traits::RegressionError;
use crate::utils::{constant_columns, design_matrix, inverse_cross_product, weighted_means};
use faer::{Col, Mat};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

/// Coefficients and residuals of a (weighted) least squares fit.
#[derive(Debug, Clone)]
pub(crate) struct LeastSquaresFit {
    pub coefficients: Col<f64>,
    pub intercept: Option<f64>,
    pub aliased: Vec<bool>,
    /// Number of estimable slope columns.
    pub rank: usize,
    pub fitted_values: Col<f64>,
    pub residuals: Col<f64>,
}

impl LeastSquaresFit {
    /// Number of estimated parameters, intercept included.
    pub fn n_params(&self) -> usize {
        self.rank + usize::from(self.intercept.is_some())
    }

    /// Linear predictor for new rows; aliased columns contribute nothing.
    pub fn predict(&self, x: &Mat<f64>) -> Col<f64> {
        linear_predictor(x, &self.coefficients, &self.aliased, self.intercept)
    }
}

/// `intercept + X β`, skipping aliased or NaN coefficients.
pub(crate) fn linear_predictor(
    x: &Mat<f64>,
    coefficients: &Col<f64>,
    aliased: &[bool],
    intercept: Option<f64>,
) -> Col<f64> {
    let b0 = intercept.unwrap_or(0.0);
    Col::from_fn(x.nrows(), |i| {
        let mut pred = b0;
        for j in 0..x.ncols() {
            if !aliased[j] && !coefficients[j].is_nan() {
                pred += x[(i, j)] * coefficients[j];
            }
        }
        pred
    })
}

/// Check that `x` and `y` agree and that there are enough rows.
pub(crate) fn validate_data(
    x: &Mat<f64>,
    y: &Col<f64>,
    with_intercept: bool,
) -> Result<(), RegressionError> {
    if x.nrows() != y.nrows() {
        return Err(RegressionError::DimensionMismatch {
            x_rows: x.nrows(),
            y_len: y.nrows(),
        });
    }

    if x.nrows() < 2 {
        return Err(RegressionError::InsufficientObservations {
            needed: 2,
            got: x.nrows(),
        });
    }

    let n_params = x.ncols() + usize::from(with_intercept);
    if x.nrows() < n_params {
        return Err(RegressionError::InsufficientObservations {
            needed: n_params,
            got: x.nrows(),
        });
    }

    let x_finite = (0..x.ncols()).all(|j| (0..x.nrows()).all(|i| x[(i, j)].is_finite()));
    if !x_finite || y.iter().any(|v| !v.is_finite()) {
        return Err(RegressionError::NonFiniteData);
    }

    Ok(())
}

/// Check observation weights: finite, non-negative and not all zero.
pub(crate) fn validate_weights(weights: &Col<f64>, n: usize) -> Result<(), RegressionError> {
    if weights.nrows() != n {
        return Err(RegressionError::DimensionMismatch {
            x_rows: n,
            y_len: weights.nrows(),
        });
    }
    if weights.iter().any(|&w| !w.is_finite() || w < 0.0) {
        return Err(RegressionError::InvalidWeights);
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(RegressionError::InvalidWeights);
    }
    Ok(())
}

/// Solve `min Σ wᵢ (yᵢ - b₀ - xᵢ'β)²`.
pub(crate) fn solve_least_squares(
    x: &Mat<f64>,
    y: &Col<f64>,
    weights: Option<&Col<f64>>,
    with_intercept: bool,
    rank_tolerance: f64,
) -> Result<LeastSquaresFit, RegressionError> {
    let n = x.nrows();
    let p = x.ncols();
    let sqrt_w = Col::from_fn(n, |i| weights.map_or(1.0, |w| w[i].sqrt()));

    // Center (with weights) when fitting an intercept
    let (x_means, y_mean) = if with_intercept {
        weighted_means(x, y, weights)
    } else {
        (Col::zeros(p), 0.0)
    };

    let z = Mat::from_fn(n, p, |i, j| sqrt_w[i] * (x[(i, j)] - x_means[j]));
    let zy = Col::from_fn(n, |i| sqrt_w[i] * (y[i] - y_mean));

    let mut aliased = if with_intercept {
        constant_columns(x, rank_tolerance)
    } else {
        vec![false; p]
    };

    let norms: Vec<f64> = (0..p)
        .map(|j| (0..n).map(|i| z[(i, j)] * z[(i, j)]).sum::<f64>().sqrt())
        .collect();
    for j in 0..p {
        if norms[j] == 0.0 {
            aliased[j] = true;
        }
    }
    let mut accepted: Vec<usize> = (0..p).filter(|&j| !aliased[j]).collect();

    // Factor again after each dropped column; R past a deficient pivot is noise
    let factors = loop {
        if accepted.is_empty() {
            break None;
        }
        let active = Mat::from_fn(n, accepted.len(), |i, k| z[(i, accepted[k])]);
        let qr = active.qr();
        let r = qr.R();
        let deficient = (0..accepted.len())
            .find(|&k| r[(k, k)].abs() <= rank_tolerance * norms[accepted[k]]);
        match deficient {
            Some(k) => {
                aliased[accepted[k]] = true;
                accepted.remove(k);
            }
            None => break Some((qr.compute_Q(), r.to_owned())),
        }
    };

    let rank = accepted.len();
    let mut coefficients = Col::from_fn(p, |_| f64::NAN);
    match factors {
        Some((q, r)) => {
            // Back-substitution: R β = Q' z_y
            let qty = q.transpose() * &zy;
            let mut beta = Col::<f64>::zeros(rank);
            for i in (0..rank).rev() {
                let mut sum = qty[i];
                for k in (i + 1)..rank {
                    sum -= r[(i, k)] * beta[k];
                }
                beta[i] = sum / r[(i, i)];
            }
            for (k, &j) in accepted.iter().enumerate() {
                coefficients[j] = beta[k];
            }
        }
        None if !with_intercept => return Err(RegressionError::SingularMatrix),
        None => {}
    }

    let intercept = with_intercept.then(|| {
        let mut b0 = y_mean;
        for &j in &accepted {
            b0 -= x_means[j] * coefficients[j];
        }
        b0
    });

    let fitted_values = linear_predictor(x, &coefficients, &aliased, intercept);
    let residuals = Col::from_fn(n, |i| y[i] - fitted_values[i]);

    Ok(LeastSquaresFit {
        coefficients,
        intercept,
        aliased,
        rank,
        fitted_values,
        residuals,
    })
}

/// Assemble a [`RegressionResult`] with fit statistics and, if requested,
/// Gaussian inference.
///
/// Sums of squares use the weights when given. Zero-weight rows do not count
/// as observations.
pub(crate) fn build_result(
    x: &Mat<f64>,
    y: &Col<f64>,
    weights: Option<&Col<f64>>,
    fit: &LeastSquaresFit,
    options: &RegressionOptions,
) -> RegressionResult {
    let n_all = y.nrows();
    let w = |i: usize| weights.map_or(1.0, |w| w[i]);
    let n = (0..n_all).filter(|&i| w(i) > 0.0).count();
    let n_params = fit.n_params();
    let has_intercept = fit.intercept.is_some();

    let sum_w: f64 = (0..n_all).map(&w).sum();
    let y_mean = (0..n_all).map(|i| w(i) * y[i]).sum::<f64>() / sum_w;
    let tss: f64 = if has_intercept {
        (0..n_all).map(|i| w(i) * (y[i] - y_mean).powi(2)).sum()
    } else {
        (0..n_all).map(|i| w(i) * y[i] * y[i]).sum()
    };
    let rss: f64 = (0..n_all).map(|i| w(i) * fit.residuals[i].powi(2)).sum();

    let r_squared = if tss > 0.0 {
        (1.0 - rss / tss).clamp(0.0, 1.0)
    } else if rss < 1e-10 {
        1.0
    } else {
        0.0
    };

    let df_resid = n.saturating_sub(n_params) as f64;
    let df_total = if has_intercept {
        n.saturating_sub(1) as f64
    } else {
        n as f64
    };
    let adj_r_squared = if df_resid > 0.0 && df_total > 0.0 {
        1.0 - (1.0 - r_squared) * df_total / df_resid
    } else {
        f64::NAN
    };

    let mse = if df_resid > 0.0 { rss / df_resid } else { f64::NAN };

    let df_model = fit.rank as f64;
    let f_statistic = if df_model > 0.0 && df_resid > 0.0 && mse > 0.0 {
        ((tss - rss) / df_model) / mse
    } else {
        f64::NAN
    };
    let f_pvalue = if f_statistic.is_finite() {
        FisherSnedecor::new(df_model, df_resid).map_or(f64::NAN, |d| d.sf(f_statistic))
    } else {
        f64::NAN
    };

    // R's logLik.lm, including the weight term for weighted fits
    let log_w: f64 = (0..n_all)
        .filter(|&i| w(i) > 0.0)
        .map(|i| w(i).ln())
        .sum();
    let nf = n as f64;
    let log_likelihood = if rss > 0.0 {
        0.5 * log_w - 0.5 * nf * ((2.0 * std::f64::consts::PI).ln() + 1.0 - nf.ln() + rss.ln())
    } else {
        f64::NAN
    };

    let mut result = RegressionResult::empty(x.ncols(), n);
    result.coefficients = fit.coefficients.clone();
    result.intercept = fit.intercept;
    result.residuals = fit.residuals.clone();
    result.fitted_values = fit.fitted_values.clone();
    result.weights = weights.cloned();
    result.rank = fit.rank;
    result.n_parameters = n_params;
    result.n_observations = n;
    result.aliased = fit.aliased.clone();
    result.rank_tolerance = options.rank_tolerance;
    result.r_squared = r_squared;
    result.adj_r_squared = adj_r_squared;
    result.mse = mse;
    result.rmse = mse.sqrt();
    result.sigma = mse.sqrt();
    result.f_statistic = f_statistic;
    result.f_pvalue = f_pvalue;
    result.confidence_level = options.confidence_level;
    // σ² counts as a parameter
    set_information_criteria(&mut result, log_likelihood, n_params + 1);

    if options.compute_inference && df_resid > 0.0 && mse.is_finite() {
        if let Some(xtx_inv) = unscaled_covariance(x, weights, fit) {
            CoefficientInference::apply(&mut result, &xtx_inv, mse, df_resid);
        }
    }

    result
}

/// `(X'WX)⁻¹` of the design actually fitted (`[1 | X]` with an intercept).
pub(crate) fn unscaled_covariance(
    x: &Mat<f64>,
    weights: Option<&Col<f64>>,
    fit: &LeastSquaresFit,
) -> Option<Mat<f64>> {
    let has_intercept = fit.intercept.is_some();
    let design = design_matrix(x, has_intercept);
    let active: Vec<bool> = has_intercept
        .then_some(true)
        .into_iter()
        .chain(fit.aliased.iter().map(|&a| !a))
        .collect();
    inverse_cross_product(&design, weights, &active)
}

/// Fill log-likelihood, AIC, AICc and BIC for `k` estimated parameters.
pub(crate) fn set_information_criteria(result: &mut RegressionResult, log_likelihood: f64, k: usize) {
    let n = result.n_observations as f64;
    let k = k as f64;
    result.log_likelihood = log_likelihood;
    if log_likelihood.is_finite() {
        result.aic = 2.0 * k - 2.0 * log_likelihood;
        result.bic = k * n.ln() - 2.0 * log_likelihood;
        result.aicc = if n - k - 1.0 > 0.0 {
            result.aic + 2.0 * k * (k + 1.0) / (n - k - 1.0)
        } else {
            f64::NAN
        };
    } else {
        result.aic = f64::NAN;
        result.aicc = f64::NAN;
        result.bic = f64::NAN;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line() {
        let x = Mat::from_fn(6, 1, |i, _| i as f64);
        let y = Col::from_fn(6, |i| 1.5 - 2.0 * i as f64);

        let fit = solve_least_squares(&x, &y, None, true, 1e-7).unwrap();
        assert!((fit.intercept.unwrap() - 1.5).abs() < 1e-10);
        assert!((fit.coefficients[0] + 2.0).abs() < 1e-10);
        assert!(fit.residuals.iter().all(|r| r.abs() < 1e-10));
    }

    #[test]
    fn test_later_collinear_column_is_aliased() {
        let x = Mat::from_fn(10, 3, |i, j| match j {
            0 => i as f64,
            1 => 2.0 * i as f64,
            _ => ((i * i) % 7) as f64,
        });
        let y = Col::from_fn(10, |i| 1.0 + i as f64 + 0.5 * ((i * i) % 7) as f64);

        let fit = solve_least_squares(&x, &y, None, true, 1e-7).unwrap();
        assert_eq!(fit.aliased, vec![false, true, false]);
        assert!(fit.coefficients[1].is_nan());
        assert!((fit.coefficients[0] - 1.0).abs() < 1e-8);
        assert_eq!(fit.n_params(), 3);
    }

    #[test]
    fn test_combination_column_is_aliased_and_later_columns_survive() {
        // Column 2 = column 0 + column 1; column 3 is independent
        let x = Mat::from_fn(12, 4, |i, j| {
            let a = i as f64;
            let b = ((i * 5) % 7) as f64;
            match j {
                0 => a,
                1 => b,
                2 => a + b,
                _ => (a - 5.0).powi(2),
            }
        });
        let y = Col::from_fn(12, |i| 2.0 + 0.5 * x[(i, 0)] - x[(i, 1)] + 0.25 * x[(i, 3)]);

        let fit = solve_least_squares(&x, &y, None, true, 1e-7).unwrap();
        assert_eq!(fit.aliased, vec![false, false, true, false]);
        assert_eq!(fit.rank, 3);
        assert!((fit.coefficients[0] - 0.5).abs() < 1e-8);
        assert!((fit.coefficients[1] + 1.0).abs() < 1e-8);
        assert!((fit.coefficients[3] - 0.25).abs() < 1e-8);
        assert!((fit.intercept.unwrap() - 2.0).abs() < 1e-8);
    }

    #[test]
    fn test_zero_weights_drop_rows() {
        let x = Mat::from_fn(5, 1, |i, _| i as f64);
        let mut y = Col::from_fn(5, |i| 2.0 * i as f64);
        y[4] = 100.0;
        let w = Col::from_fn(5, |i| if i == 4 { 0.0 } else { 1.0 });

        let fit = solve_least_squares(&x, &y, Some(&w), true, 1e-7).unwrap();
        assert!((fit.coefficients[0] - 2.0).abs() < 1e-10);
        assert!(fit.intercept.unwrap().abs() < 1e-10);
    }

    #[test]
    fn test_no_intercept_all_zero_columns_is_singular() {
        let x = Mat::<f64>::zeros(4, 2);
        let y = Col::from_fn(4, |i| i as f64);
        assert!(matches!(
            solve_least_squares(&x, &y, None, false, 1e-7),
            Err(RegressionError::SingularMatrix)
        ));
    }

    #[test]
    fn test_validate_weights() {
        let ok = Col::from_fn(3, |_| 1.0);
        assert!(validate_weights(&ok, 3).is_ok());
        let negative = Col::from_fn(3, |i| i as f64 - 1.0);
        assert!(validate_weights(&negative, 3).is_err());
        let zeros = Col::<f64>::zeros(3);
        assert!(validate_weights(&zeros, 3).is_err());
        assert!(validate_weights(&ok, 4).is_err());
    }
}

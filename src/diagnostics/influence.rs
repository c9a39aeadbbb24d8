//! Influence measures: Cook's distance, DFFITS, DFBETAS and COVRATIO.

use crate::core::RegressionResult;
use crate::diagnostics::leverage::weighted_leverage;
use crate::diagnostics::residuals::{
    deleted_variances, externally_studentized_residuals, studentized_residuals,
};
use crate::utils::{design_matrix, inverse_cross_product};
use faer::{Col, Mat};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

/// Cook's distance `Dᵢ = rᵢ² hᵢᵢ / (p (1 - hᵢᵢ))` from internally
/// studentized residuals.
pub fn cooks_distance(studentized: &Col<f64>, leverage: &Col<f64>, n_params: usize) -> Col<f64> {
    let p = n_params as f64;
    Col::from_fn(studentized.nrows(), |i| {
        let h = leverage[i];
        let d = studentized[i].powi(2) * h / (p * (1.0 - h));
        if d.is_finite() {
            d
        } else {
            f64::NAN
        }
    })
}

/// DFFITS `tᵢ √(hᵢᵢ / (1 - hᵢᵢ))` from externally studentized residuals.
pub fn dffits(external: &Col<f64>, leverage: &Col<f64>) -> Col<f64> {
    Col::from_fn(external.nrows(), |i| {
        let h = leverage[i];
        external[i] * (h / (1.0 - h)).sqrt()
    })
}

/// Indices with Cook's distance above `threshold` (default 4/n).
pub fn influential_cooks(cooks_d: &Col<f64>, threshold: Option<f64>) -> Vec<usize> {
    let cutoff = threshold.unwrap_or(4.0 / cooks_d.nrows() as f64);
    cooks_d
        .iter()
        .enumerate()
        .filter(|(_, &d)| d.is_finite() && d > cutoff)
        .map(|(i, _)| i)
        .collect()
}

/// Indices with |DFFITS| above `threshold` (default 2√(p/n)).
pub fn influential_dffits(dffits: &Col<f64>, n_params: usize, threshold: Option<f64>) -> Vec<usize> {
    let n = dffits.nrows();
    let cutoff = threshold.unwrap_or(2.0 * (n_params as f64 / n as f64).sqrt());
    dffits
        .iter()
        .enumerate()
        .filter(|(_, &d)| d.is_finite() && d.abs() > cutoff)
        .map(|(i, _)| i)
        .collect()
}

/// Case-deletion diagnostics of a least squares fit, as R's
/// `influence.measures`.
///
/// `dfbetas` has one column per estimated coefficient of the fitted design
/// (intercept first when present). Aliased columns are NaN.
#[derive(Debug, Clone)]
pub struct InfluenceMeasures {
    pub leverage: Col<f64>,
    pub studentized: Col<f64>,
    pub external_studentized: Col<f64>,
    pub cooks_distance: Col<f64>,
    pub dffits: Col<f64>,
    pub dfbetas: Mat<f64>,
    pub covratio: Col<f64>,
    n_params: usize,
}

impl InfluenceMeasures {
    /// Compute all measures for the model that produced `result` on `x`.
    ///
    /// Uses the stored weights, so WLS fits are handled as R does for `lm`
    /// with weights.
    pub fn compute(x: &Mat<f64>, result: &RegressionResult) -> Self {
        let n = x.nrows();
        let with_intercept = result.intercept.is_some();
        let weights = result.weights.as_ref();
        let p = result.n_parameters;
        let df = result.residual_df();
        let sigma = (result.weighted_rss() / df as f64).sqrt();

        let leverage = weighted_leverage(x, weights, &result.aliased, with_intercept);
        let studentized = studentized_residuals(&result.residuals, weights, &leverage, sigma);
        let external = externally_studentized_residuals(&result.residuals, weights, &leverage, df);
        let deleted = deleted_variances(&result.residuals, weights, &leverage, df);

        let cooks = cooks_distance(&studentized, &leverage, p);
        let dffits_values = dffits(&external, &leverage);

        // (s₍ᵢ₎/s)^(2p) / (1 - hᵢᵢ)
        let covratio = Col::from_fn(n, |i| {
            (deleted[i] / (sigma * sigma)).powi(p as i32) / (1.0 - leverage[i])
        });

        let design = design_matrix(x, with_intercept);
        let active: Vec<bool> = with_intercept
            .then_some(true)
            .into_iter()
            .chain(result.aliased.iter().map(|&a| !a))
            .collect();
        let cols: Vec<usize> = (0..design.ncols()).filter(|&j| active[j]).collect();
        let xtx_inv = inverse_cross_product(&design, weights, &active);

        let dfbetas = Mat::from_fn(n, design.ncols(), |i, j| {
            let Some(c) = &xtx_inv else {
                return f64::NAN;
            };
            if !active[j] {
                return f64::NAN;
            }
            let w = weights.map_or(1.0, |w| w[i]);
            let cx: f64 = cols.iter().map(|&k| c[(j, k)] * design[(i, k)]).sum();
            let change = w * cx * result.residuals[i] / (1.0 - leverage[i]);
            change / (deleted[i].sqrt() * c[(j, j)].sqrt())
        });

        Self {
            leverage,
            studentized,
            external_studentized: external,
            cooks_distance: cooks,
            dffits: dffits_values,
            dfbetas,
            covratio,
            n_params: p,
        }
    }

    /// Rows flagged by any of R's `influence.measures` rules:
    /// |DFBETAS| > 1, |DFFITS| > 3√(p/(n-p)), |1 - COVRATIO| > 3p/(n-p),
    /// F(p, n-p) cdf of Cook's D > 0.5, or hᵢᵢ > 3p/n.
    pub fn influential(&self) -> Vec<usize> {
        let n = self.leverage.nrows();
        let p = self.n_params as f64;
        let df = n as f64 - p;
        if df <= 0.0 {
            return Vec::new();
        }
        let f_dist = FisherSnedecor::new(p, df).ok();

        (0..n)
            .filter(|&i| {
                let dfbeta = (0..self.dfbetas.ncols()).any(|j| self.dfbetas[(i, j)].abs() > 1.0);
                let dffit = self.dffits[i].abs() > 3.0 * (p / df).sqrt();
                let cov = (1.0 - self.covratio[i]).abs() > 3.0 * p / df;
                let cook = f_dist
                    .as_ref()
                    .is_some_and(|f| self.cooks_distance[i].is_finite() && f.cdf(self.cooks_distance[i]) > 0.5);
                let hat = self.leverage[i] > 3.0 * p / n as f64;
                dfbeta || dffit || cov || cook || hat
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooks_distance_formula() {
        let r = Col::from_fn(3, |i| [1.0, 2.0, 0.0][i]);
        let h = Col::from_fn(3, |_| 0.5);
        let d = cooks_distance(&r, &h, 2);
        assert!((d[0] - 0.5).abs() < 1e-12);
        assert!((d[1] - 2.0).abs() < 1e-12);
        assert_eq!(d[2], 0.0);
    }

    #[test]
    fn test_dffits_formula() {
        let t = Col::from_fn(1, |_| 2.0);
        let h = Col::from_fn(1, |_| 0.2);
        let d = dffits(&t, &h);
        assert!((d[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_influential_thresholds() {
        let cooks = Col::from_fn(10, |i| if i == 2 { 0.9 } else { 0.01 });
        assert_eq!(influential_cooks(&cooks, None), vec![2]);

        let d = Col::from_fn(10, |i| if i == 7 { -1.5 } else { 0.1 });
        assert_eq!(influential_dffits(&d, 2, None), vec![7]);
    }
}

//! Serial correlation diagnostics for time-ordered residuals.

use crate::diagnostics::DiagnosticError;
use faer::Col;
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use std::fmt;

/// Sample autocorrelations r₀ … r_max_lag (r₀ = 1).
///
/// Uses the standard estimator
/// `r_k = Σ_{t≥k} (x_t - x̄)(x_{t-k} - x̄) / Σ_t (x_t - x̄)²`,
/// the same as R's `acf`.
///
/// # Errors
/// `InsufficientData` for fewer than two values, `InvalidLag` when
/// `max_lag >= n`, `ConstantSeries` when the series has no variance.
pub fn acf(x: &Col<f64>, max_lag: usize) -> Result<Vec<f64>, DiagnosticError> {
    let n = x.nrows();
    if n < 2 {
        return Err(DiagnosticError::InsufficientData { needed: 2, got: n });
    }
    if max_lag >= n {
        return Err(DiagnosticError::InvalidLag(format!(
            "max_lag {max_lag} must be below the series length {n}"
        )));
    }

    let mean = x.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = x.iter().map(|v| v - mean).collect();
    let denom: f64 = centered.iter().map(|d| d * d).sum();
    if denom <= 0.0 {
        return Err(DiagnosticError::ConstantSeries);
    }

    Ok((0..=max_lag)
        .map(|k| {
            let num: f64 = (k..n).map(|t| centered[t] * centered[t - k]).sum();
            num / denom
        })
        .collect())
}

/// Partial autocorrelations for lags 1 … max_lag (Durbin-Levinson).
///
/// Element `k - 1` is the last coefficient of the AR(k) fit to the sample
/// autocorrelations, as R's `pacf`.
pub fn pacf(x: &Col<f64>, max_lag: usize) -> Result<Vec<f64>, DiagnosticError> {
    if max_lag == 0 {
        return Err(DiagnosticError::InvalidLag("max_lag must be at least 1".to_string()));
    }
    let r = acf(x, max_lag)?;

    let mut partial = Vec::with_capacity(max_lag);
    let mut phi: Vec<f64> = Vec::new();
    for k in 1..=max_lag {
        let num = r[k] - (1..k).map(|j| phi[j - 1] * r[k - j]).sum::<f64>();
        let den = 1.0 - (1..k).map(|j| phi[j - 1] * r[j]).sum::<f64>();
        let phi_kk = num / den;

        let previous = phi.clone();
        for j in 1..k {
            phi[j - 1] = previous[j - 1] - phi_kk * previous[k - j - 1];
        }
        phi.push(phi_kk);
        partial.push(phi_kk);
    }
    Ok(partial)
}

/// Approximate white-noise band ±z_{(1+level)/2} / √n for ACF plots.
pub fn acf_confidence_bound(n: usize, level: f64) -> f64 {
    match Normal::new(0.0, 1.0) {
        Ok(normal) if n > 0 && level > 0.0 && level < 1.0 => {
            normal.inverse_cdf((1.0 + level) / 2.0) / (n as f64).sqrt()
        }
        _ => f64::NAN,
    }
}

/// Durbin-Watson statistic `Σ (e_t - e_{t-1})² / Σ e_t²`.
///
/// Near 2 for uncorrelated residuals, roughly `2 (1 - r₁)` in general.
pub fn durbin_watson(residuals: &Col<f64>) -> Result<f64, DiagnosticError> {
    let n = residuals.nrows();
    if n < 2 {
        return Err(DiagnosticError::InsufficientData { needed: 2, got: n });
    }
    let ss: f64 = residuals.iter().map(|e| e * e).sum();
    if ss <= 0.0 {
        return Err(DiagnosticError::ConstantSeries);
    }
    let diff: f64 = (1..n).map(|t| (residuals[t] - residuals[t - 1]).powi(2)).sum();
    Ok(diff / ss)
}

/// Result of a portmanteau test for serial correlation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortmanteauTest {
    pub statistic: f64,
    pub df: usize,
    pub p_value: f64,
}

impl fmt::Display for PortmanteauTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X-squared = {:.4}, df = {}, p-value = {:.4e}",
            self.statistic, self.df, self.p_value
        )
    }
}

/// Ljung-Box test `Q = n(n+2) Σ_{k=1}^{lags} r_k² / (n - k)`.
///
/// Compared with χ² on `lags - fitted_df` degrees of freedom, where
/// `fitted_df` counts ARMA parameters estimated before the test (0 for raw
/// regression residuals).
pub fn ljung_box(
    x: &Col<f64>,
    lags: usize,
    fitted_df: usize,
) -> Result<PortmanteauTest, DiagnosticError> {
    if lags == 0 || lags <= fitted_df {
        return Err(DiagnosticError::InvalidLag(format!(
            "lags ({lags}) must exceed fitted_df ({fitted_df})"
        )));
    }
    let r = acf(x, lags)?;
    let n = x.nrows() as f64;

    let statistic = n * (n + 2.0) * (1..=lags).map(|k| r[k] * r[k] / (n - k as f64)).sum::<f64>();
    let df = lags - fitted_df;
    let p_value = ChiSquared::new(df as f64).map_or(f64::NAN, |d| d.sf(statistic));

    Ok(PortmanteauTest {
        statistic,
        df,
        p_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternating(n: usize) -> Col<f64> {
        Col::from_fn(n, |i| if i % 2 == 0 { 1.0 } else { -1.0 })
    }

    #[test]
    fn test_acf_lag_zero_is_one() {
        let x = Col::from_fn(20, |i| ((i * 7) % 5) as f64);
        let r = acf(&x, 5).expect("acf");
        assert!((r[0] - 1.0).abs() < 1e-12);
        assert_eq!(r.len(), 6);
    }

    #[test]
    fn test_acf_alternating_series() {
        let r = acf(&alternating(10), 2).expect("acf");
        // r₁ = -9/10, r₂ = 8/10
        assert!((r[1] + 0.9).abs() < 1e-12);
        assert!((r[2] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_pacf_first_lag_matches_acf() {
        let x = Col::from_fn(30, |i| ((i * 13) % 7) as f64 + 0.1 * i as f64);
        let r = acf(&x, 3).expect("acf");
        let p = pacf(&x, 3).expect("pacf");
        assert!((p[0] - r[1]).abs() < 1e-12);
        let phi22 = (r[2] - r[1] * r[1]) / (1.0 - r[1] * r[1]);
        assert!((p[1] - phi22).abs() < 1e-12);
    }

    #[test]
    fn test_durbin_watson() {
        let dw = durbin_watson(&alternating(10)).expect("dw");
        assert!((dw - 3.6).abs() < 1e-12);

        let constant = Col::from_fn(5, |_| 2.0);
        assert!((durbin_watson(&constant).expect("dw")).abs() < 1e-12);
    }

    #[test]
    fn test_ljung_box_detects_alternation() {
        let test = ljung_box(&alternating(40), 5, 0).expect("ljung-box");
        assert_eq!(test.df, 5);
        assert!(test.p_value < 1e-6);
    }

    #[test]
    fn test_invalid_inputs() {
        let x = Col::from_fn(5, |i| i as f64);
        assert!(matches!(acf(&x, 5), Err(DiagnosticError::InvalidLag(_))));
        assert!(matches!(ljung_box(&x, 2, 2), Err(DiagnosticError::InvalidLag(_))));

        let constant = Col::from_fn(5, |_| 1.0);
        assert!(matches!(acf(&constant, 1), Err(DiagnosticError::ConstantSeries)));
        assert!((acf_confidence_bound(100, 0.95) - 0.196).abs() < 1e-3);
    }
}

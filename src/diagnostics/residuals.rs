//! Scaled residuals for outlier detection.
//!
//! All functions take raw residuals `eᵢ`. Weighted fits pass their weights
//! so that `√wᵢ eᵢ` is scaled, matching R's `rstandard`/`rstudent` for `lm`
//! with weights.

use faer::Col;

fn scaled(residuals: &Col<f64>, weights: Option<&Col<f64>>) -> Col<f64> {
    Col::from_fn(residuals.nrows(), |i| {
        weights.map_or(1.0, |w| w[i].sqrt()) * residuals[i]
    })
}

/// `√wᵢ eᵢ / σ̂`.
pub fn standardized_residuals(
    residuals: &Col<f64>,
    weights: Option<&Col<f64>>,
    sigma: f64,
) -> Col<f64> {
    let e = scaled(residuals, weights);
    if !(sigma > 0.0 && sigma.is_finite()) {
        return Col::from_fn(e.nrows(), |_| f64::NAN);
    }
    Col::from_fn(e.nrows(), |i| e[i] / sigma)
}

/// Internally studentized residuals `√wᵢ eᵢ / (σ̂ √(1 - hᵢᵢ))`.
///
/// Rows with hᵢᵢ = 1 are fitted exactly and get NaN.
pub fn studentized_residuals(
    residuals: &Col<f64>,
    weights: Option<&Col<f64>>,
    leverage: &Col<f64>,
    sigma: f64,
) -> Col<f64> {
    let e = scaled(residuals, weights);
    Col::from_fn(e.nrows(), |i| {
        let one_minus_h = 1.0 - leverage[i];
        if !(sigma > 0.0) || one_minus_h <= 1e-12 {
            f64::NAN
        } else {
            e[i] / (sigma * one_minus_h.sqrt())
        }
    })
}

/// Leave-one-out residual variance `σ̂²₍ᵢ₎`.
///
/// `σ̂²₍ᵢ₎ = (RSS - eᵢ²/(1 - hᵢᵢ)) / (df - 1)`, from the fit with row i
/// removed but without refitting.
pub fn deleted_variances(
    residuals: &Col<f64>,
    weights: Option<&Col<f64>>,
    leverage: &Col<f64>,
    df_resid: usize,
) -> Col<f64> {
    let e = scaled(residuals, weights);
    let n = e.nrows();
    if df_resid < 2 {
        return Col::from_fn(n, |_| f64::NAN);
    }
    let rss: f64 = e.iter().map(|v| v * v).sum();

    Col::from_fn(n, |i| {
        let one_minus_h = 1.0 - leverage[i];
        if one_minus_h <= 1e-12 {
            return f64::NAN;
        }
        let s2 = (rss - e[i] * e[i] / one_minus_h) / (df_resid - 1) as f64;
        if s2 > 0.0 {
            s2
        } else {
            f64::NAN
        }
    })
}

/// Externally studentized residuals `√wᵢ eᵢ / (σ̂₍ᵢ₎ √(1 - hᵢᵢ))`.
///
/// Under the model these follow a t distribution on `df - 1` degrees of
/// freedom.
pub fn externally_studentized_residuals(
    residuals: &Col<f64>,
    weights: Option<&Col<f64>>,
    leverage: &Col<f64>,
    df_resid: usize,
) -> Col<f64> {
    let e = scaled(residuals, weights);
    let s2 = deleted_variances(residuals, weights, leverage, df_resid);
    Col::from_fn(e.nrows(), |i| e[i] / (s2[i] * (1.0 - leverage[i])).sqrt())
}

/// PRESS (prediction) residuals `eᵢ / (1 - hᵢᵢ)`.
pub fn press_residuals(residuals: &Col<f64>, leverage: &Col<f64>) -> Col<f64> {
    Col::from_fn(residuals.nrows(), |i| {
        let one_minus_h = 1.0 - leverage[i];
        if one_minus_h <= 1e-12 {
            f64::NAN
        } else {
            residuals[i] / one_minus_h
        }
    })
}

/// Indices with |rᵢ| above `threshold` (2 or 3 are usual).
pub fn residual_outliers(studentized: &Col<f64>, threshold: f64) -> Vec<usize> {
    studentized
        .iter()
        .enumerate()
        .filter(|(_, &r)| r.abs() > threshold)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardized_residuals() {
        let residuals = Col::from_fn(4, |i| [2.0, -2.0, 4.0, 0.0][i]);
        let z = standardized_residuals(&residuals, None, 2.0);
        assert_eq!(z[0], 1.0);
        assert_eq!(z[2], 2.0);

        let w = Col::from_fn(4, |_| 4.0);
        let zw = standardized_residuals(&residuals, Some(&w), 2.0);
        assert_eq!(zw[0], 2.0);
    }

    #[test]
    fn test_studentized_uniform_leverage() {
        let residuals = Col::from_fn(10, |i| i as f64 - 4.5);
        let leverage = Col::from_fn(10, |_| 0.2);

        let r = studentized_residuals(&residuals, None, &leverage, 3.0);
        let factor = 3.0 * 0.8_f64.sqrt();
        for i in 0..10 {
            assert!((r[i] - residuals[i] / factor).abs() < 1e-12);
        }
    }

    #[test]
    fn test_external_exceeds_internal_for_large_residual() {
        let residuals = Col::from_fn(10, |i| if i == 3 { 6.0 } else { 0.5 * (i as f64 - 4.5) / 4.5 });
        let leverage = Col::from_fn(10, |_| 0.2);
        let df = 8;
        let rss: f64 = residuals.iter().map(|e| e * e).sum();
        let sigma = (rss / df as f64).sqrt();

        let internal = studentized_residuals(&residuals, None, &leverage, sigma);
        let external = externally_studentized_residuals(&residuals, None, &leverage, df);
        assert!(external[3].abs() > internal[3].abs());
    }

    #[test]
    fn test_press_residuals() {
        let residuals = Col::from_fn(2, |i| [1.0, 1.0][i]);
        let leverage = Col::from_fn(2, |i| [0.5, 1.0][i]);
        let press = press_residuals(&residuals, &leverage);
        assert_eq!(press[0], 2.0);
        assert!(press[1].is_nan());
    }

    #[test]
    fn test_outlier_detection() {
        let studentized = Col::from_fn(10, |i| if i == 5 { 4.0 } else { 0.1 * i as f64 });
        assert_eq!(residual_outliers(&studentized, 2.0), vec![5]);
    }
}

//! Small descriptive statistics used by the robust estimators.

/// Median of a slice; NaN for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Normal-consistent MAD about zero: `median(|e|) / 0.6745`.
///
/// This is the residual scale used by `MASS::rlm`, where residuals are
/// already centred by the fit.
pub fn mad_about_zero(residuals: &[f64]) -> f64 {
    let abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
    median(&abs) / 0.6745
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with divisor n - 1.
pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Indices that sort `values` ascending.
pub fn argsort(values: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_mad_about_zero() {
        let r = [-2.0, -1.0, 0.0, 1.0, 2.0];
        assert!((mad_about_zero(&r) - 1.0 / 0.6745).abs() < 1e-12);
    }

    #[test]
    fn test_sample_variance() {
        assert!((sample_variance(&[1.0, 2.0, 3.0, 4.0]) - 5.0 / 3.0).abs() < 1e-12);
        assert!(sample_variance(&[1.0]).is_nan());
    }

    #[test]
    fn test_argsort() {
        assert_eq!(argsort(&[3.0, -1.0, 2.0]), vec![1, 2, 0]);
    }
}

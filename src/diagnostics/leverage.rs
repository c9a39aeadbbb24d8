//! Hat values.

use crate::utils::{design_matrix, inverse_cross_product};
use faer::{Col, Mat};

/// Diagonal of `H = W½ X (X'WX)⁻¹ X' W½`, leaving out aliased columns.
///
/// `weights = None` gives the ordinary least squares hat values. A row of
/// zero weight has zero leverage, and the values sum to the number of
/// estimated parameters. NaN throughout when `X'WX` is singular.
pub fn weighted_leverage(
    x: &Mat<f64>,
    weights: Option<&Col<f64>>,
    aliased: &[bool],
    with_intercept: bool,
) -> Col<f64> {
    let design = design_matrix(x, with_intercept);
    let active: Vec<bool> = with_intercept
        .then_some(true)
        .into_iter()
        .chain(aliased.iter().map(|&a| !a))
        .collect();

    let Some(c) = inverse_cross_product(&design, weights, &active) else {
        return Col::from_fn(x.nrows(), |_| f64::NAN);
    };
    let kept: Vec<usize> = (0..design.ncols()).filter(|&j| active[j]).collect();

    Col::from_fn(x.nrows(), |i| {
        let row = |j: usize| design[(i, j)];
        let h: f64 = kept
            .iter()
            .map(|&j| row(j) * kept.iter().map(|&k| c[(j, k)] * row(k)).sum::<f64>())
            .sum();
        let w = weights.map_or(1.0, |w| w[i]);
        (w * h).clamp(0.0, 1.0)
    })
}

/// Hat values of an unweighted fit of full rank.
pub fn compute_leverage(x: &Mat<f64>, with_intercept: bool) -> Col<f64> {
    weighted_leverage(x, None, &vec![false; x.ncols()], with_intercept)
}

/// Rows whose leverage exceeds `threshold`, or `2p/n` when none is given.
pub fn high_leverage_points(
    leverage: &Col<f64>,
    n_params: usize,
    threshold: Option<f64>,
) -> Vec<usize> {
    let cutoff = threshold.unwrap_or(2.0 * n_params as f64 / leverage.nrows() as f64);
    (0..leverage.nrows())
        .filter(|&i| leverage[i] > cutoff)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_straight_line_formula() {
        // h = 1/n + (x - x̄)² / Sxx, with x = 0..4, x̄ = 2, Sxx = 10
        let x = Mat::from_fn(5, 1, |i, _| i as f64);
        let h = compute_leverage(&x, true);
        assert_relative_eq!(h[0], 0.6, epsilon = 1e-10);
        assert_relative_eq!(h[2], 0.2, epsilon = 1e-10);
        assert_relative_eq!(h.iter().sum::<f64>(), 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_without_intercept() {
        // h = x² / Σx²
        let x = Mat::from_fn(3, 1, |i, _| (i + 1) as f64);
        let h = compute_leverage(&x, false);
        assert_relative_eq!(h[2], 9.0 / 14.0, epsilon = 1e-12);
    }

    #[test]
    fn test_aliased_column_is_ignored() {
        let x = Mat::from_fn(12, 2, |i, j| (i as f64) * if j == 0 { 1.0 } else { -2.5 });
        let reduced = Mat::from_fn(12, 1, |i, _| i as f64);

        let h = weighted_leverage(&x, None, &[false, true], true);
        let expected = compute_leverage(&reduced, true);
        for i in 0..12 {
            assert_relative_eq!(h[i], expected[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_zero_weight_rows_have_no_leverage() {
        let x = Mat::from_fn(8, 1, |i, _| i as f64);
        let w = Col::from_fn(8, |i| if i == 7 { 0.0 } else { 1.0 + i as f64 });

        let h = weighted_leverage(&x, Some(&w), &[false], true);
        assert_eq!(h[7], 0.0);
        assert_relative_eq!(h.iter().sum::<f64>(), 2.0, epsilon = 1e-8);
    }

    #[test]
    fn test_remote_row_is_flagged() {
        let x = Mat::from_fn(20, 1, |i, _| if i == 19 { 100.0 } else { i as f64 });
        let h = compute_leverage(&x, true);
        assert_eq!(high_leverage_points(&h, 2, None), vec![19]);
        assert!(high_leverage_points(&h, 2, Some(1.0)).is_empty());
    }
}

//! t tests and intervals for individual coefficients.

use crate::core::RegressionResult;
use faer::{Col, Mat};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Wald inference from an unscaled covariance `C` and a scale `σ²`:
/// `se_j = σ √C_jj`, `t_j = β_j / se_j`, two-sided p-values and intervals
/// from Student's t on `df` degrees of freedom.
pub struct CoefficientInference;

/// One row of the coefficient table.
#[derive(Debug, Clone, Copy)]
struct WaldTest {
    se: f64,
    t: f64,
    p: f64,
    lower: f64,
    upper: f64,
}

impl WaldTest {
    const MISSING: Self = Self {
        se: f64::NAN,
        t: f64::NAN,
        p: f64::NAN,
        lower: f64::NAN,
        upper: f64::NAN,
    };

    fn new(estimate: f64, variance: f64, dist: Option<&StudentsT>, t_crit: f64) -> Self {
        if !(variance >= 0.0) || estimate.is_nan() {
            return Self::MISSING;
        }
        let se = variance.sqrt();
        let t = if se > 0.0 { estimate / se } else { f64::NAN };
        let p = match dist {
            Some(d) if t.is_finite() => 2.0 * d.sf(t.abs()),
            _ => f64::NAN,
        };
        Self {
            se,
            t,
            p,
            lower: estimate - t_crit * se,
            upper: estimate + t_crit * se,
        }
    }
}

fn students_t(df: f64) -> Option<StudentsT> {
    if df > 0.0 {
        StudentsT::new(0.0, 1.0, df).ok()
    } else {
        None
    }
}

impl CoefficientInference {
    /// Quantile `t_{1-α/2, df}` for a two-sided interval at `level`; NaN when
    /// `df` is not positive.
    pub fn t_critical(df: f64, level: f64) -> f64 {
        students_t(df).map_or(f64::NAN, |d| d.inverse_cdf(0.5 + level / 2.0))
    }

    /// Fill the inference fields of `result`.
    ///
    /// `unscaled_cov` is indexed like the fitted design: with an intercept,
    /// row/column 0 belongs to the intercept and j + 1 to slope j. Aliased
    /// slopes get NaN throughout.
    pub fn apply(result: &mut RegressionResult, unscaled_cov: &Mat<f64>, sigma2: f64, df: f64) {
        let dist = students_t(df);
        let t_crit = Self::t_critical(df, result.confidence_level);
        let offset = usize::from(result.intercept.is_some());

        let slopes: Vec<WaldTest> = (0..result.coefficients.nrows())
            .map(|j| {
                if result.aliased[j] {
                    WaldTest::MISSING
                } else {
                    let k = j + offset;
                    WaldTest::new(
                        result.coefficients[j],
                        sigma2 * unscaled_cov[(k, k)],
                        dist.as_ref(),
                        t_crit,
                    )
                }
            })
            .collect();

        let column = |f: fn(&WaldTest) -> f64| Col::from_fn(slopes.len(), |j| f(&slopes[j]));
        result.std_errors = Some(column(|w| w.se));
        result.t_statistics = Some(column(|w| w.t));
        result.p_values = Some(column(|w| w.p));
        result.conf_interval_lower = Some(column(|w| w.lower));
        result.conf_interval_upper = Some(column(|w| w.upper));

        if let Some(intercept) = result.intercept {
            let w = WaldTest::new(intercept, sigma2 * unscaled_cov[(0, 0)], dist.as_ref(), t_crit);
            result.intercept_std_error = Some(w.se);
            result.intercept_t_statistic = Some(w.t);
            result.intercept_p_value = Some(w.p);
            result.intercept_conf_interval = Some((w.lower, w.upper));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_t_critical() {
        assert_relative_eq!(CoefficientInference::t_critical(1e6, 0.95), 1.959964, epsilon = 1e-3);
        // qt(0.975, 48)
        assert_relative_eq!(CoefficientInference::t_critical(48.0, 0.95), 2.010635, epsilon = 1e-5);
        assert!(CoefficientInference::t_critical(0.0, 0.95).is_nan());
    }

    #[test]
    fn test_apply_with_intercept() {
        let mut result = RegressionResult::empty(2, 10);
        result.coefficients[0] = 2.0;
        result.coefficients[1] = f64::NAN;
        result.aliased = vec![false, true];
        result.intercept = Some(1.0);
        let cov = Mat::from_fn(3, 3, |i, j| if i == j { 0.25 } else { 0.0 });

        CoefficientInference::apply(&mut result, &cov, 4.0, 8.0);

        let se = result.std_errors.as_ref().expect("se");
        let t = result.t_statistics.as_ref().expect("t");
        assert_relative_eq!(se[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(t[0], 2.0, epsilon = 1e-12);
        assert!(se[1].is_nan() && t[1].is_nan());
        assert_relative_eq!(result.intercept_std_error.expect("se"), 1.0, epsilon = 1e-12);

        // 2 P(T_8 > 2)
        let p = result.p_values.as_ref().expect("p")[0];
        assert_relative_eq!(p, 0.08052, epsilon = 1e-4);

        let (lo, hi) = result.intercept_conf_interval.expect("ci");
        let half = CoefficientInference::t_critical(8.0, 0.95);
        assert_relative_eq!(lo, 1.0 - half, epsilon = 1e-12);
        assert_relative_eq!(hi, 1.0 + half, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_df_leaves_p_values_missing() {
        let mut result = RegressionResult::empty(1, 2);
        result.coefficients[0] = 1.0;
        CoefficientInference::apply(&mut result, &Mat::identity(1, 1), 1.0, 0.0);

        assert_relative_eq!(result.std_errors.as_ref().expect("se")[0], 1.0);
        assert!(result.p_values.as_ref().expect("p")[0].is_nan());
    }
}

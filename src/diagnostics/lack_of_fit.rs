//! Pure-error lack-of-fit test and nested model comparison.

use crate::diagnostics::DiagnosticError;
use crate::solvers::FittedRegressor;
use faer::{Col, Mat};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use std::collections::HashMap;
use std::fmt;

fn f_test(numerator: f64, df1: f64, denominator: f64, df2: f64) -> (f64, f64) {
    let f = (numerator / df1) / (denominator / df2);
    let p = if f.is_finite() {
        FisherSnedecor::new(df1, df2).map_or(f64::NAN, |d| d.sf(f))
    } else if f.is_infinite() {
        0.0
    } else {
        f64::NAN
    };
    (f, p)
}

/// Decomposition `SSE = SSPE + SSLF` with the lack-of-fit F test.
#[derive(Debug, Clone, PartialEq)]
pub struct LackOfFitTest {
    /// Number of distinct predictor rows.
    pub groups: usize,
    pub sse: f64,
    pub pure_error_ss: f64,
    pub lack_of_fit_ss: f64,
    pub df_pure_error: usize,
    pub df_lack_of_fit: usize,
    pub f_statistic: f64,
    pub p_value: f64,
}

impl LackOfFitTest {
    /// Pure-error mean square, the model-free estimate of σ².
    pub fn pure_error_ms(&self) -> f64 {
        self.pure_error_ss / self.df_pure_error as f64
    }

    /// Lack-of-fit mean square.
    pub fn lack_of_fit_ms(&self) -> f64 {
        self.lack_of_fit_ss / self.df_lack_of_fit as f64
    }
}

impl fmt::Display for LackOfFitTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<14}{:>6}{:>14}{:>14}{:>10}{:>12}",
            "", "Df", "Sum Sq", "Mean Sq", "F value", "Pr(>F)"
        )?;
        writeln!(
            f,
            "{:<14}{:>6}{:>14.4}{:>14.4}{:>10.4}{:>12.4e}",
            "Lack of fit",
            self.df_lack_of_fit,
            self.lack_of_fit_ss,
            self.lack_of_fit_ms(),
            self.f_statistic,
            self.p_value
        )?;
        writeln!(
            f,
            "{:<14}{:>6}{:>14.4}{:>14.4}",
            "Pure error",
            self.df_pure_error,
            self.pure_error_ss,
            self.pure_error_ms()
        )?;
        write!(
            f,
            "{:<14}{:>6}{:>14.4}",
            "Residual",
            self.df_pure_error + self.df_lack_of_fit,
            self.sse
        )
    }
}

/// Pure-error lack-of-fit test for a fitted model.
///
/// Rows with identical predictor values form groups. Within-group variation
/// of `y` is pure error (df n - c). The rest of the residual sum of squares
/// is lack of fit (df c - p). Weighted fits use their stored weights.
///
/// # Errors
/// `NoReplicates` when every row is distinct (n = c), `TooFewGroups` when
/// c ≤ p, and `DimensionMismatch` when `x`, `y` and the fit disagree.
pub fn lack_of_fit_test<F: FittedRegressor + ?Sized>(
    x: &Mat<f64>,
    y: &Col<f64>,
    fitted: &F,
) -> Result<LackOfFitTest, DiagnosticError> {
    let result = fitted.result();
    let n = y.nrows();
    for len in [x.nrows(), result.residuals.nrows()] {
        if len != n {
            return Err(DiagnosticError::DimensionMismatch {
                expected: n,
                got: len,
            });
        }
    }
    let w = |i: usize| result.weights.as_ref().map_or(1.0, |w| w[i]);

    // Adding 0.0 folds -0.0 into 0.0 before taking the bit pattern
    let mut groups: HashMap<Vec<u64>, Vec<usize>> = HashMap::new();
    for i in (0..n).filter(|&i| w(i) > 0.0) {
        let key = (0..x.ncols()).map(|j| (x[(i, j)] + 0.0).to_bits()).collect();
        groups.entry(key).or_default().push(i);
    }

    let n_used: usize = groups.values().map(Vec::len).sum();
    let c = groups.len();
    let p = result.n_parameters;
    if n_used <= c {
        return Err(DiagnosticError::NoReplicates);
    }
    if c <= p {
        return Err(DiagnosticError::TooFewGroups { groups: c, params: p });
    }

    let pure_error_ss: f64 = groups
        .values()
        .map(|rows| {
            let sw: f64 = rows.iter().map(|&i| w(i)).sum();
            let mean = rows.iter().map(|&i| w(i) * y[i]).sum::<f64>() / sw;
            rows.iter().map(|&i| w(i) * (y[i] - mean).powi(2)).sum::<f64>()
        })
        .sum();
    let sse: f64 = (0..n).map(|i| w(i) * result.residuals[i].powi(2)).sum();
    let lack_of_fit_ss = (sse - pure_error_ss).max(0.0);

    let df_pure_error = n_used - c;
    let df_lack_of_fit = c - p;
    let (f_statistic, p_value) = f_test(
        lack_of_fit_ss,
        df_lack_of_fit as f64,
        pure_error_ss,
        df_pure_error as f64,
    );

    Ok(LackOfFitTest {
        groups: c,
        sse,
        pure_error_ss,
        lack_of_fit_ss,
        df_pure_error,
        df_lack_of_fit,
        f_statistic,
        p_value,
    })
}

/// Comparison of a reduced model against a full model that contains it.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedFTest {
    pub rss_reduced: f64,
    pub rss_full: f64,
    pub df_reduced: usize,
    pub df_full: usize,
    pub f_statistic: f64,
    pub p_value: f64,
}

impl fmt::Display for NestedFTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  {:>8}{:>14}{:>6}{:>14}{:>10}{:>12}",
            "Res.Df", "RSS", "Df", "Sum of Sq", "F", "Pr(>F)"
        )?;
        writeln!(f, "1 {:>8}{:>14.4}", self.df_reduced, self.rss_reduced)?;
        write!(
            f,
            "2 {:>8}{:>14.4}{:>6}{:>14.4}{:>10.4}{:>12.4e}",
            self.df_full,
            self.rss_full,
            self.df_reduced - self.df_full,
            self.rss_reduced - self.rss_full,
            self.f_statistic,
            self.p_value
        )
    }
}

/// Extra-sum-of-squares F test between nested least squares fits, as R's
/// `anova(reduced, full)`.
///
/// Nesting of the column spaces is not checked. The fits must use the same
/// rows, and the full model must have fewer residual degrees of freedom.
pub fn nested_f_test<R, F>(reduced: &R, full: &F) -> Result<NestedFTest, DiagnosticError>
where
    R: FittedRegressor + ?Sized,
    F: FittedRegressor + ?Sized,
{
    let (r, f) = (reduced.result(), full.result());
    if r.residuals.nrows() != f.residuals.nrows() {
        return Err(DiagnosticError::DimensionMismatch {
            expected: r.residuals.nrows(),
            got: f.residuals.nrows(),
        });
    }
    let (df_reduced, df_full) = (r.residual_df(), f.residual_df());
    if df_full >= df_reduced {
        return Err(DiagnosticError::NotNested(format!(
            "full model has {df_full} residual df, reduced has {df_reduced}"
        )));
    }
    if df_full == 0 {
        return Err(DiagnosticError::InsufficientData { needed: 1, got: 0 });
    }

    let rss_reduced = r.weighted_rss();
    let rss_full = f.weighted_rss();
    let (f_statistic, p_value) = f_test(
        rss_reduced - rss_full,
        (df_reduced - df_full) as f64,
        rss_full,
        df_full as f64,
    );

    Ok(NestedFTest {
        rss_reduced,
        rss_full,
        df_reduced,
        df_full,
        f_statistic,
        p_value,
    })
}

//! Tests for non-constant error variance.

use crate::diagnostics::DiagnosticError;
use crate::solvers::linear::solve_least_squares;
use faer::{Col, Mat};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::fmt;

/// Result of the Breusch-Pagan test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreuschPaganTest {
    /// `n R²` of the auxiliary regression.
    pub statistic: f64,
    pub df: usize,
    pub p_value: f64,
}

impl fmt::Display for BreuschPaganTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BP = {:.4}, df = {}, p-value = {:.4e}",
            self.statistic, self.df, self.p_value
        )
    }
}

/// Studentized (Koenker) Breusch-Pagan test.
///
/// Regresses eᵢ² on the columns of `x` (with an intercept) and compares
/// `n R²` with χ² on the number of estimable columns. This is the default
/// of R's `lmtest::bptest`.
pub fn breusch_pagan(x: &Mat<f64>, residuals: &Col<f64>) -> Result<BreuschPaganTest, DiagnosticError> {
    let n = residuals.nrows();
    if x.nrows() != n {
        return Err(DiagnosticError::DimensionMismatch {
            expected: n,
            got: x.nrows(),
        });
    }
    let needed = x.ncols() + 2;
    if n < needed {
        return Err(DiagnosticError::InsufficientData { needed, got: n });
    }

    let squared = Col::from_fn(n, |i| residuals[i] * residuals[i]);
    let mean = squared.iter().sum::<f64>() / n as f64;
    let tss: f64 = squared.iter().map(|v| (v - mean).powi(2)).sum();
    if tss <= 0.0 {
        return Err(DiagnosticError::ConstantSeries);
    }

    let aux = solve_least_squares(x, &squared, None, true, 1e-7)?;
    let rss: f64 = aux.residuals.iter().map(|r| r * r).sum();
    let statistic = n as f64 * (1.0 - rss / tss);
    let df = aux.rank;
    if df == 0 {
        return Err(DiagnosticError::InsufficientData { needed: 1, got: 0 });
    }
    let p_value = ChiSquared::new(df as f64).map_or(f64::NAN, |d| d.sf(statistic));

    Ok(BreuschPaganTest {
        statistic,
        df,
        p_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_fanning_residuals() {
        let n = 60;
        let x = Mat::from_fn(n, 1, |i, _| (i + 1) as f64);
        let residuals = Col::from_fn(n, |i| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            sign * 0.2 * (i + 1) as f64
        });

        let test = breusch_pagan(&x, &residuals).expect("test should run");
        assert_eq!(test.df, 1);
        assert!(test.p_value < 0.001);
    }

    #[test]
    fn test_constant_squared_residuals_are_rejected() {
        let n = 40;
        let x = Mat::from_fn(n, 1, |i, _| i as f64);
        // |e| constant, sign pattern unrelated to x
        let residuals = Col::from_fn(n, |i| if (i * 7) % 3 == 0 { 1.0 } else { -1.0 });

        assert!(matches!(
            breusch_pagan(&x, &residuals),
            Err(DiagnosticError::ConstantSeries)
        ));
    }
}

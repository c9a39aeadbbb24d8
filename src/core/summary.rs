//! Printable model summaries in the layout of R's `summary()`.

use crate::core::RegressionResult;
use crate::solvers::FittedRegressor;
use crate::utils::median;
use std::fmt;

/// One line of the coefficient table.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientRow {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
}

impl CoefficientRow {
    fn stars(&self) -> &'static str {
        match self.p_value {
            p if p.is_nan() => "",
            p if p < 0.001 => "***",
            p if p < 0.01 => "**",
            p if p < 0.05 => "*",
            p if p < 0.1 => ".",
            _ => "",
        }
    }
}

/// Summary of a fitted model: residual quantiles, coefficient table and
/// fit statistics.
#[derive(Debug, Clone)]
pub struct ModelSummary {
    pub title: String,
    /// Min, 1Q, median, 3Q, max of the residuals.
    pub residual_quantiles: [f64; 5],
    pub coefficients: Vec<CoefficientRow>,
    pub sigma: f64,
    pub residual_df: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub f_pvalue: f64,
    pub model_df: usize,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub notes: Vec<String>,
}

impl ModelSummary {
    /// Build a summary from a result and the names of the predictor columns.
    ///
    /// Missing names are filled with `x1`, `x2`, …
    pub fn new(title: impl Into<String>, result: &RegressionResult, names: &[&str]) -> Self {
        let mut coefficients = Vec::new();

        if let Some(b0) = result.intercept {
            coefficients.push(CoefficientRow {
                name: "(Intercept)".to_string(),
                estimate: b0,
                std_error: result.intercept_std_error.unwrap_or(f64::NAN),
                t_value: result.intercept_t_statistic.unwrap_or(f64::NAN),
                p_value: result.intercept_p_value.unwrap_or(f64::NAN),
            });
        }

        let entry = |v: &Option<faer::Col<f64>>, j: usize| v.as_ref().map_or(f64::NAN, |c| c[j]);
        for j in 0..result.coefficients.nrows() {
            let name = names
                .get(j)
                .map_or_else(|| format!("x{}", j + 1), |s| s.to_string());
            coefficients.push(CoefficientRow {
                name,
                estimate: result.coefficients[j],
                std_error: entry(&result.std_errors, j),
                t_value: entry(&result.t_statistics, j),
                p_value: entry(&result.p_values, j),
            });
        }

        Self {
            title: title.into(),
            residual_quantiles: quantiles(&result.residuals.iter().copied().collect::<Vec<_>>()),
            coefficients,
            sigma: result.sigma,
            residual_df: result.residual_df(),
            r_squared: result.r_squared,
            adj_r_squared: result.adj_r_squared,
            f_statistic: result.f_statistic,
            f_pvalue: result.f_pvalue,
            model_df: result.model_df(),
            log_likelihood: result.log_likelihood,
            aic: result.aic,
            bic: result.bic,
            notes: Vec::new(),
        }
    }

    /// Build a summary from any fitted model.
    pub fn from_fitted<F: FittedRegressor + ?Sized>(
        title: impl Into<String>,
        fitted: &F,
        names: &[&str],
    ) -> Self {
        Self::new(title, fitted.result(), names)
    }

    /// Append a free-form line printed after the statistics.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Look up a coefficient row by name.
    pub fn coefficient(&self, name: &str) -> Option<&CoefficientRow> {
        self.coefficients.iter().find(|row| row.name == name)
    }
}

/// Type 7 quantiles (R's default) at 0, .25, .5, .75, 1.
fn quantiles(values: &[f64]) -> [f64; 5] {
    if values.is_empty() {
        return [f64::NAN; 5];
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let at = |p: f64| {
        let h = (sorted.len() - 1) as f64 * p;
        let lo = h.floor() as usize;
        let hi = h.ceil() as usize;
        sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
    };
    [at(0.0), at(0.25), median(&sorted), at(0.75), at(1.0)]
}

fn number(v: f64) -> String {
    if v.is_nan() {
        "NA".to_string()
    } else if v != 0.0 && (v.abs() < 1e-3 || v.abs() >= 1e6) {
        format!("{v:.3e}")
    } else {
        format!("{v:.4}")
    }
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f)?;
        writeln!(f, "Residuals:")?;
        writeln!(
            f,
            "{:>10}{:>10}{:>10}{:>10}{:>10}",
            "Min", "1Q", "Median", "3Q", "Max"
        )?;
        for q in self.residual_quantiles {
            write!(f, "{:>10}", number(q))?;
        }
        writeln!(f)?;
        writeln!(f)?;

        let width = self
            .coefficients
            .iter()
            .map(|row| row.name.len())
            .max()
            .unwrap_or(0)
            .max(11);
        writeln!(f, "Coefficients:")?;
        writeln!(
            f,
            "{:<width$}{:>12}{:>12}{:>10}{:>12}",
            "", "Estimate", "Std. Error", "t value", "Pr(>|t|)"
        )?;
        for row in &self.coefficients {
            writeln!(
                f,
                "{:<width$}{:>12}{:>12}{:>10}{:>12} {}",
                row.name,
                number(row.estimate),
                number(row.std_error),
                number(row.t_value),
                number(row.p_value),
                row.stars()
            )?;
        }
        writeln!(f, "---")?;
        writeln!(
            f,
            "Signif. codes:  0 '***' 0.001 '**' 0.01 '*' 0.05 '.' 0.1 ' ' 1"
        )?;
        writeln!(f)?;

        if self.sigma.is_finite() {
            writeln!(
                f,
                "Residual standard error: {} on {} degrees of freedom",
                number(self.sigma),
                self.residual_df
            )?;
        }
        if self.r_squared.is_finite() {
            write!(f, "Multiple R-squared: {}", number(self.r_squared))?;
            if self.adj_r_squared.is_finite() {
                write!(f, ",  Adjusted R-squared: {}", number(self.adj_r_squared))?;
            }
            writeln!(f)?;
        }
        if self.f_statistic.is_finite() {
            writeln!(
                f,
                "F-statistic: {} on {} and {} DF,  p-value: {}",
                number(self.f_statistic),
                self.model_df,
                self.residual_df,
                number(self.f_pvalue)
            )?;
        }
        if self.log_likelihood.is_finite() {
            writeln!(
                f,
                "Log-likelihood: {},  AIC: {},  BIC: {}",
                number(self.log_likelihood),
                number(self.aic),
                number(self.bic)
            )?;
        }
        for note in &self.notes {
            writeln!(f, "{note}")?;
        }
        Ok(())
    }
}

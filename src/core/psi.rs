//! Psi functions for robust M-estimation.
//!
//! A psi function ψ(u) bounds the influence of a scaled residual u = e/s.
//! The IRLS weight is w(u) = ψ(u)/u.

use super::options::OptionsError;

/// Influence function used by [`RobustRegressor`](crate::solvers::RobustRegressor).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PsiFunction {
    /// Huber: linear up to `k`, constant beyond.
    Huber { k: f64 },
    /// Hampel three-part redescending function.
    Hampel { a: f64, b: f64, c: f64 },
    /// Tukey bisquare (biweight), redescends to zero at `c`.
    Bisquare { c: f64 },
}

impl Default for PsiFunction {
    fn default() -> Self {
        Self::huber()
    }
}

impl PsiFunction {
    /// Huber with k = 1.345 (95% efficiency at the normal).
    pub fn huber() -> Self {
        Self::Huber { k: 1.345 }
    }

    /// Hampel with a = 2, b = 4, c = 8.
    pub fn hampel() -> Self {
        Self::Hampel {
            a: 2.0,
            b: 4.0,
            c: 8.0,
        }
    }

    /// Bisquare with c = 4.685 (95% efficiency at the normal).
    pub fn bisquare() -> Self {
        Self::Bisquare { c: 4.685 }
    }

    /// Short name used in summaries.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Huber { .. } => "Huber",
            Self::Hampel { .. } => "Hampel",
            Self::Bisquare { .. } => "bisquare",
        }
    }

    /// Whether ψ returns to zero for large residuals.
    pub fn is_redescending(&self) -> bool {
        !matches!(self, Self::Huber { .. })
    }

    /// Check the tuning constants.
    pub fn validate(&self) -> Result<(), OptionsError> {
        match *self {
            Self::Huber { k } => positive(k),
            Self::Bisquare { c } => positive(c),
            Self::Hampel { a, b, c } => {
                if a.is_finite() && b.is_finite() && c.is_finite() && 0.0 < a && a <= b && b < c
                {
                    Ok(())
                } else {
                    Err(OptionsError::InvalidHampelConstants(a, b, c))
                }
            }
        }
    }

    /// ψ(u).
    pub fn psi(&self, u: f64) -> f64 {
        let abs_u = u.abs();
        match *self {
            Self::Huber { k } => u.clamp(-k, k),
            Self::Hampel { a, b, c } => {
                if abs_u <= a {
                    u
                } else if abs_u <= b {
                    a * u.signum()
                } else if abs_u <= c {
                    a * u.signum() * (c - abs_u) / (c - b)
                } else {
                    0.0
                }
            }
            Self::Bisquare { c } => {
                if abs_u <= c {
                    let t = 1.0 - (u / c).powi(2);
                    u * t * t
                } else {
                    0.0
                }
            }
        }
    }

    /// IRLS weight w(u) = ψ(u)/u, with w(0) = 1.
    pub fn weight(&self, u: f64) -> f64 {
        let abs_u = u.abs();
        match *self {
            Self::Huber { k } => {
                if abs_u <= k {
                    1.0
                } else {
                    k / abs_u
                }
            }
            Self::Hampel { a, b, c } => {
                if abs_u <= a {
                    1.0
                } else if abs_u <= b {
                    a / abs_u
                } else if abs_u <= c {
                    a * (c - abs_u) / ((c - b) * abs_u)
                } else {
                    0.0
                }
            }
            Self::Bisquare { c } => {
                if abs_u <= c {
                    let t = 1.0 - (u / c).powi(2);
                    t * t
                } else {
                    0.0
                }
            }
        }
    }

    /// ψ'(u).
    pub fn derivative(&self, u: f64) -> f64 {
        let abs_u = u.abs();
        match *self {
            Self::Huber { k } => {
                if abs_u <= k {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Hampel { a, b, c } => {
                if abs_u <= a {
                    1.0
                } else if abs_u <= b {
                    0.0
                } else if abs_u <= c {
                    -a / (c - b)
                } else {
                    0.0
                }
            }
            Self::Bisquare { c } => {
                if abs_u <= c {
                    let t = (u / c).powi(2);
                    (1.0 - t) * (1.0 - 5.0 * t)
                } else {
                    0.0
                }
            }
        }
    }
}

fn positive(value: f64) -> Result<(), OptionsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(OptionsError::InvalidTuningConstant(value))
    }
}

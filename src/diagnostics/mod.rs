//! Regression diagnostics.
//!
//! - **Leverage**: observations with unusual predictor values
//! - **Residuals**: standardized and studentized residuals for outlier detection
//! - **Influence**: Cook's distance, DFFITS, DFBETAS and COVRATIO
//! - **Autocorrelation**: ACF, PACF, Durbin-Watson and Ljung-Box for time-ordered residuals
//! - **Heteroscedasticity**: the studentized Breusch-Pagan test
//! - **Lack of fit**: pure-error F test and nested model comparison
//!
//! # Example
//!
//! ```rust,ignore
//! use regression_remedies::diagnostics::{acf, durbin_watson, InfluenceMeasures};
//!
//! let influence = InfluenceMeasures::compute(&x, fitted.result());
//! println!("influential rows: {:?}", influence.influential());
//!
//! let dw = durbin_watson(fitted.residuals())?;
//! let rho = acf(fitted.residuals(), 10)?;
//! ```

mod autocorrelation;
mod heteroscedasticity;
mod influence;
mod lack_of_fit;
mod leverage;
mod residuals;

use crate::solvers::RegressionError;
use thiserror::Error;

/// Errors from diagnostic tests.
#[derive(Debug, Error)]
pub enum DiagnosticError {
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("series has zero variance")]
    ConstantSeries,

    #[error("no replicated predictor rows; pure error cannot be estimated")]
    NoReplicates,

    #[error("{groups} distinct predictor rows do not exceed {params} parameters")]
    TooFewGroups { groups: usize, params: usize },

    #[error("models are not nested: {0}")]
    NotNested(String),

    #[error("invalid lag specification: {0}")]
    InvalidLag(String),

    #[error(transparent)]
    Regression(#[from] RegressionError),
}

pub use autocorrelation::{
    acf, acf_confidence_bound, durbin_watson, ljung_box, pacf, PortmanteauTest,
};
pub use heteroscedasticity::{breusch_pagan, BreuschPaganTest};
pub use influence::{
    cooks_distance, dffits, influential_cooks, influential_dffits, InfluenceMeasures,
};
pub use lack_of_fit::{lack_of_fit_test, nested_f_test, LackOfFitTest, NestedFTest};
pub use leverage::{compute_leverage, high_leverage_points, weighted_leverage};
pub use residuals::{
    deleted_variances, externally_studentized_residuals, press_residuals, residual_outliers,
    standardized_residuals, studentized_residuals,
};

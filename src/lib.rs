//! Regression diagnostics and remedies.
//!
//! Estimators for the situations where ordinary least squares assumptions
//! fail, together with the diagnostics that reveal those failures:
//!
//! - **OLS** with R-style aliasing, inference and prediction intervals
//! - **WLS** with supplied or estimated variance weights
//! - **GLS** with AR(1) errors (maximum likelihood or iterated Prais-Winsten)
//! - **Robust** M-estimation (Huber, Hampel, bisquare), **LTS** and
//!   **quantile** regression
//! - Diagnostics: leverage, studentized residuals, influence, ACF/PACF,
//!   Durbin-Watson, Ljung-Box, Breusch-Pagan and pure-error lack of fit
//!
//! # Example
//!
//! ```rust,ignore
//! use regression_remedies::prelude::*;
//!
//! let cars = datasets::cars();
//! let x = cars.design(&["speed"])?;
//! let y = cars.column("dist")?;
//!
//! let fitted = OlsRegressor::builder().build().fit(&x, &y)?;
//! println!("{}", ModelSummary::from_fitted("lm(dist ~ speed)", &fitted, &["speed"]));
//!
//! let bp = breusch_pagan(&x, fitted.residuals())?;
//! println!("{bp}");
//! ```

pub mod core;
pub mod datasets;
pub mod diagnostics;
pub mod inference;
pub mod solvers;
pub mod utils;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{
        IntervalType, ModelSummary, PredictionResult, PsiFunction, RegressionOptions,
        RegressionOptionsBuilder, RegressionResult,
    };
    pub use crate::datasets::{self, Dataset, DatasetError};
    pub use crate::diagnostics::{
        acf, breusch_pagan, durbin_watson, lack_of_fit_test, ljung_box, nested_f_test, pacf,
        DiagnosticError, InfluenceMeasures,
    };
    pub use crate::solvers::{
        CorrelationEstimation, FittedRegressor, GlsRegressor, LtsRegressor, OlsRegressor,
        QuantileRegressor, RegressionError, Regressor, RobustRegressor, VarianceModel,
        WlsRegressor,
    };
}

pub use crate::core::{
    IntervalType, ModelSummary, PredictionResult, PsiFunction, RegressionOptions,
    RegressionOptionsBuilder, RegressionResult,
};
pub use crate::solvers::{FittedRegressor, RegressionError, Regressor};

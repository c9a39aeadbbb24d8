//! Core types for regression analysis.

mod options;
mod prediction;
mod psi;
mod result;
mod summary;

pub use options::{OptionsError, RegressionOptions, RegressionOptionsBuilder};
pub use prediction::{IntervalType, PredictionResult};
pub use psi::PsiFunction;
pub use result::RegressionResult;
pub use summary::{CoefficientRow, ModelSummary};

//! Statistical inference (standard errors, p-values, confidence intervals).

mod coefficient;
mod prediction;

pub use coefficient::CoefficientInference;
pub use prediction::compute_prediction_intervals;

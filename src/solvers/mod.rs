//! Regression solvers implementing various estimation methods.

pub(crate) mod linear;
mod traits;
mod ols;
mod wls;
mod gls;
mod robust;
mod lts;
mod quantile;

pub use traits::{FittedRegressor, Regressor, RegressionError};
pub use ols::{FittedOls, OlsRegressor, OlsRegressorBuilder};
pub use wls::{estimate_variance_weights, FittedWls, VarianceModel, WlsRegressor, WlsRegressorBuilder};
pub use gls::{prais_winsten, CorrelationEstimation, FittedGls, GlsRegressor, GlsRegressorBuilder};
pub use robust::{FittedRobust, RobustRegressor, RobustRegressorBuilder};
pub use lts::{lts_consistency_factor, FittedLts, LtsRegressor, LtsRegressorBuilder};
pub use quantile::{
    check_loss, hall_sheather_bandwidth, FittedQuantile, QuantileRegressor,
    QuantileRegressorBuilder,
};

//! # Weighted Least Squares (WLS) Regression
//!
//! Stopping distances in the cars data spread out as speed grows. The
//! Breusch-Pagan test quantifies the fanning, and WLS with weights estimated
//! from the residuals gives each observation its due precision.
//!
//! ## What it shows
//! - Breusch-Pagan test on OLS residuals
//! - Supplied weights (1/speed) and estimated variance weights
//! - Residuals scaled by √w after reweighting
//!
//! Run with: `cargo run --example wls`

use faer::Col;
use regression_remedies::datasets;
use regression_remedies::diagnostics::breusch_pagan;
use regression_remedies::prelude::*;
use std::error::Error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Weighted Least Squares (WLS) Regression ===\n");

    let cars = datasets::cars();
    let x = cars.design(&["speed"])?;
    let y = cars.column("dist")?;

    let ols = OlsRegressor::builder().build().fit(&x, &y)?;
    println!("OLS residuals:   {}", breusch_pagan(&x, ols.residuals())?);

    // Variance proportional to speed
    let supplied = WlsRegressor::builder()
        .weights(Col::from_fn(x.nrows(), |i| 1.0 / x[(i, 0)]))
        .build()
        .fit(&x, &y)?;
    println!(
        "\n{}\n",
        ModelSummary::from_fitted("lm(dist ~ speed, weights = 1/speed)", &supplied, &["speed"])
    );

    for model in [VarianceModel::StdDevOnPredictors, VarianceModel::StdDevOnFitted] {
        let estimated = WlsRegressor::builder()
            .estimate_weights(model)
            .iterations(2)
            .build()
            .fit(&x, &y)?;

        println!("--- Estimated weights ({model:?}) ---");
        println!(
            "  slope = {:.4} (OLS {:.4}), weight range = [{:.4}, {:.4}]",
            estimated.coefficients()[0],
            ols.coefficients()[0],
            estimated.weights().iter().copied().fold(f64::INFINITY, f64::min),
            estimated.weights().iter().copied().fold(0.0, f64::max),
        );
        println!(
            "  weighted residuals: {}\n",
            breusch_pagan(&x, &estimated.weighted_residuals())?
        );
    }

    Ok(())
}

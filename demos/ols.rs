//! # Ordinary Least Squares (OLS) Regression
//!
//! Fits `lm(dist ~ speed)` to the cars data and walks through the standard
//! residual diagnostics that decide whether a remedy is needed.
//!
//! ## What it shows
//! - R-style coefficient summary
//! - Confidence and prediction intervals
//! - Leverage, studentized residuals and influence
//! - Aliased (collinear) columns reported as NA
//!
//! Run with: `cargo run --example ols`
//! Set `RUST_LOG=regression_remedies=debug` to see solver traces.

use faer::{Col, Mat};
use regression_remedies::datasets;
use regression_remedies::diagnostics::{residual_outliers, InfluenceMeasures};
use regression_remedies::prelude::*;
use regression_remedies::solvers::FittedOls;
use std::error::Error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Ordinary Least Squares (OLS) Regression ===\n");

    let cars = datasets::cars();
    let x = cars.design(&["speed"])?;
    let y = cars.column("dist")?;

    let fitted = OlsRegressor::builder().build().fit(&x, &y)?;
    println!(
        "{}\n",
        ModelSummary::from_fitted("lm(dist ~ speed, data = cars)", &fitted, &["speed"])
    );

    intervals(&fitted);
    influence(&x, &fitted);
    aliased_columns()?;
    Ok(())
}

fn intervals(fitted: &impl FittedRegressor) {
    println!("--- Intervals at speed = 10, 21 ---\n");

    let x_new = Mat::from_fn(2, 1, |i, _| [10.0, 21.0][i]);
    for interval in [IntervalType::Confidence, IntervalType::Prediction] {
        let pred = fitted.predict_with_interval(&x_new, Some(interval), 0.95);
        println!("{interval:?}:");
        for i in 0..pred.len() {
            println!(
                "  fit = {:>7.3}  [{:>7.3}, {:>7.3}]",
                pred.fit[i], pred.lower[i], pred.upper[i]
            );
        }
    }
    println!();
}

fn influence(x: &Mat<f64>, fitted: &FittedOls) {
    println!("--- Influence ---\n");

    let measures = InfluenceMeasures::compute(x, fitted.result());
    for &i in &measures.influential() {
        println!(
            "  row {:>2}: h = {:.3}, r* = {:>6.3}, D = {:.3}, DFFITS = {:>6.3}",
            i + 1,
            measures.leverage[i],
            measures.external_studentized[i],
            measures.cooks_distance[i],
            measures.dffits[i]
        );
    }
    println!(
        "  |r*| > 2.5: {:?}\n",
        residual_outliers(&measures.external_studentized, 2.5)
            .iter()
            .map(|i| i + 1)
            .collect::<Vec<_>>()
    );
}

fn aliased_columns() -> Result<(), Box<dyn Error>> {
    println!("--- Aliased columns ---\n");

    // Height in inches and in centimetres carry the same information
    let women = datasets::women();
    let n = women.n_rows();
    let height = women.column("height")?;
    let weight = women.column("weight")?;
    let x = Mat::from_fn(n, 2, |i, j| if j == 0 { height[i] } else { 2.54 * height[i] });
    let fitted = OlsRegressor::builder().build().fit(&x, &weight)?;

    println!(
        "{}",
        ModelSummary::from_fitted("lm(weight ~ height + height_cm)", &fitted, &["height", "height_cm"])
    );

    let check: Col<f64> = fitted.predict(&Mat::from_fn(1, 2, |_, j| [65.0, 165.1][j]));
    println!("predicted weight at 65 in: {:.2}", check[0]);
    Ok(())
}

//! # Lack-of-Fit Testing
//!
//! Speeds in the cars data are heavily replicated, so the residual sum of
//! squares splits into pure error and lack of fit. A nested F test then asks
//! whether a quadratic term earns its place.
//!
//! Run with: `cargo run --example lack_of_fit`

use faer::Mat;
use regression_remedies::datasets;
use regression_remedies::diagnostics::{lack_of_fit_test, nested_f_test};
use regression_remedies::prelude::*;
use std::error::Error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Lack-of-Fit Testing ===\n");

    let cars = datasets::cars();
    let x = cars.design(&["speed"])?;
    let y = cars.column("dist")?;

    let linear = OlsRegressor::builder().build().fit(&x, &y)?;
    let lof = lack_of_fit_test(&x, &y, &linear)?;
    println!("Pure-error ANOVA for lm(dist ~ speed):\n{lof}\n");
    println!(
        "{} distinct speeds, pure-error estimate of sigma = {:.3} (model sigma {:.3})\n",
        lof.groups,
        lof.pure_error_ms().sqrt(),
        linear.result().sigma
    );

    let x2 = Mat::from_fn(x.nrows(), 2, |i, j| x[(i, 0)].powi(j as i32 + 1));
    let quadratic = OlsRegressor::builder().build().fit(&x2, &y)?;
    println!(
        "{}\n",
        ModelSummary::from_fitted("lm(dist ~ speed + I(speed^2))", &quadratic, &["speed", "speed^2"])
    );
    println!("anova(linear, quadratic):\n{}", nested_f_test(&linear, &quadratic)?);

    Ok(())
}

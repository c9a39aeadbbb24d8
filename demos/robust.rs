//! # Robust Regression
//!
//! Brownlee's stack loss data contain a handful of unusual plant days.
//! Compares least squares with Huber and bisquare M-estimation, least
//! trimmed squares and median (LAD) regression.
//!
//! Run with: `cargo run --example robust`

use regression_remedies::datasets;
use regression_remedies::prelude::*;
use std::error::Error;
use tracing_subscriber::EnvFilter;

const NAMES: [&str; 3] = ["air_flow", "water_temp", "acid_conc"];

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Robust Regression ===\n");

    let data = datasets::stackloss();
    let x = data.design(&NAMES)?;
    let y = data.column("stack_loss")?;

    let ols = OlsRegressor::builder().build().fit(&x, &y)?;
    print_row("OLS", &ols);

    for psi in [PsiFunction::huber(), PsiFunction::hampel(), PsiFunction::bisquare()] {
        let fitted = RobustRegressor::builder().psi(psi).build().fit(&x, &y)?;
        print_row(psi.name(), &fitted);
        println!(
            "{:>12} scale = {:.3}, days with weight < 0.5: {:?}",
            "",
            fitted.scale(),
            fitted.downweighted(0.5).iter().map(|i| i + 1).collect::<Vec<_>>()
        );
    }

    let lts = LtsRegressor::builder().seed(2024).build().fit(&x, &y)?;
    print_row("LTS", &lts);
    println!(
        "{:>12} raw scale = {:.3}, outlying days: {:?}",
        "",
        lts.raw_scale(),
        lts.outliers().iter().map(|i| i + 1).collect::<Vec<_>>()
    );

    let lad = QuantileRegressor::builder().tau(0.5).build().fit(&x, &y)?;
    print_row("LAD", &lad);
    println!();

    let huber = RobustRegressor::builder().build().fit(&x, &y)?;
    println!(
        "{}",
        ModelSummary::from_fitted("rlm(stack.loss ~ ., psi = psi.huber)", &huber, &NAMES)
            .with_note(format!("converged after {} IRLS iterations", huber.iterations()))
    );

    Ok(())
}

fn print_row(label: &str, fitted: &impl FittedRegressor) {
    let b = fitted.coefficients();
    println!(
        "{label:>12}: {:>9.4} {:>8.4} {:>8.4} {:>8.4}",
        fitted.intercept().unwrap_or(0.0),
        b[0],
        b[1],
        b[2]
    );
}

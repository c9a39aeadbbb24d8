//! # Regression with AR(1) Errors
//!
//! Quarterly company sales regressed on industry sales leave positively
//! autocorrelated residuals. The example diagnoses the correlation, then
//! fits GLS with AR(1) errors by maximum likelihood and by iterated
//! Prais-Winsten.
//!
//! Run with: `cargo run --example gls_ar1`

use faer::Mat;
use regression_remedies::datasets;
use regression_remedies::diagnostics::{acf, acf_confidence_bound, durbin_watson, ljung_box, pacf};
use regression_remedies::prelude::*;
use std::error::Error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== GLS with AR(1) Errors ===\n");

    let data = datasets::blaisdell();
    let x = data.design(&["industry"])?;
    let y = data.column("company")?;

    let ols = OlsRegressor::builder().build().fit(&x, &y)?;
    println!("{}\n", ModelSummary::from_fitted("lm(company ~ industry)", &ols, &["industry"]));

    let e = ols.residuals();
    let bound = acf_confidence_bound(e.nrows(), 0.95);
    println!("Durbin-Watson: {:.4}", durbin_watson(e)?);
    println!("Ljung-Box (4 lags): {}", ljung_box(e, 4, 0)?);
    println!("lag   acf    pacf   (band ±{bound:.3})");
    let r = acf(e, 4)?;
    let partial = pacf(e, 4)?;
    for k in 1..=4 {
        println!("{k:>3} {:>6.3} {:>7.3}", r[k], partial[k - 1]);
    }
    println!();

    let ml = GlsRegressor::builder().build().fit(&x, &y)?;
    println!(
        "{}\n",
        ModelSummary::from_fitted("gls(company ~ industry, corAR1, ML)", &ml, &["industry"])
            .with_note(format!("phi = {:.4} after {} iterations", ml.phi(), ml.iterations()))
            .with_note(format!(
                "Durbin-Watson of normalized residuals: {:.4}",
                durbin_watson(ml.normalized_residuals())?
            ))
    );

    let pw = GlsRegressor::builder()
        .estimation(CorrelationEstimation::IteratedPraisWinsten)
        .build()
        .fit(&x, &y)?;
    println!(
        "Prais-Winsten: phi = {:.4}, slope = {:.5}, converged = {}",
        pw.phi(),
        pw.coefficients()[0],
        pw.converged()
    );

    // Next two quarters with industry sales projected at 175.3 and 178.0
    let x_next = Mat::from_fn(2, 1, |i, _| [175.3, 178.0][i]);
    let forecast = ml.forecast(&x_next);
    println!("forecast: {:.3}, {:.3}", forecast[0], forecast[1]);

    Ok(())
}

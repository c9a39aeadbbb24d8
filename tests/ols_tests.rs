//! OLS regression tests, validated against R's `lm()` on bundled datasets.

mod common;

use approx::assert_relative_eq;
use faer::{Col, Mat};
use regression_remedies::datasets;
use regression_remedies::diagnostics::durbin_watson;
use regression_remedies::prelude::*;

// ============================================================================
// Basic Regression Tests
// ============================================================================

#[test]
fn test_simple_linear_regression_with_intercept() {
    // y = 2 + 3*x
    let x = Mat::from_fn(5, 1, |i, _| i as f64);
    let y = Col::from_fn(5, |i| 2.0 + 3.0 * i as f64);

    let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("fit should succeed");

    assert_relative_eq!(fitted.coefficients()[0], 3.0, epsilon = 1e-10);
    assert_relative_eq!(fitted.intercept().expect("intercept"), 2.0, epsilon = 1e-10);
    assert_relative_eq!(fitted.r_squared(), 1.0, epsilon = 1e-10);
}

#[test]
fn test_regression_without_intercept() {
    let x = Mat::from_fn(5, 1, |i, _| (i + 1) as f64);
    let y = Col::from_fn(5, |i| 3.0 * (i + 1) as f64);

    let fitted = OlsRegressor::builder()
        .with_intercept(false)
        .build()
        .fit(&x, &y)
        .expect("fit should succeed");

    assert_relative_eq!(fitted.coefficients()[0], 3.0, epsilon = 1e-10);
    assert!(fitted.intercept().is_none());
}

#[test]
fn test_recovers_coefficients_from_noisy_data() {
    let (x, y, truth) = common::generate_linear_data(200, 3, 5.0, 0.1, 7);
    let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("fit should succeed");

    for j in 0..3 {
        assert_relative_eq!(fitted.coefficients()[j], truth[j], epsilon = 0.05);
    }
    assert_relative_eq!(fitted.intercept().expect("intercept"), 5.0, epsilon = 0.05);
    assert!(fitted.result().sigma > 0.05 && fitted.result().sigma < 0.2);
}

// ============================================================================
// Reference Datasets (R's lm())
// ============================================================================

#[test]
fn test_cars_matches_r() {
    // lm(dist ~ speed, data = cars)
    let cars = datasets::cars();
    let x = cars.design(&["speed"]).expect("column");
    let y = cars.column("dist").expect("column");

    let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("fit should succeed");
    let result = fitted.result();

    assert_relative_eq!(result.intercept.expect("intercept"), -17.5791, epsilon = 1e-4);
    assert_relative_eq!(result.coefficients[0], 3.9324, epsilon = 1e-4);
    assert_relative_eq!(result.intercept_std_error.expect("se"), 6.7584, epsilon = 1e-4);
    assert_relative_eq!(result.std_errors.as_ref().expect("se")[0], 0.4155, epsilon = 1e-4);
    assert_relative_eq!(result.sigma, 15.38, epsilon = 1e-2);
    assert_relative_eq!(result.r_squared, 0.6511, epsilon = 1e-4);
    assert_relative_eq!(result.adj_r_squared, 0.6438, epsilon = 1e-4);
    assert_relative_eq!(result.f_statistic, 89.57, epsilon = 1e-2);
    assert_eq!(result.residual_df(), 48);
    assert_relative_eq!(result.ess() / result.tss(), result.r_squared, epsilon = 1e-12);
    assert_relative_eq!(result.rss() + result.ess(), result.tss(), epsilon = 1e-8);

    // logLik(fit); AIC(fit); BIC(fit)
    assert_relative_eq!(result.log_likelihood, -206.5784, epsilon = 1e-3);
    assert_relative_eq!(result.aic, 419.1569, epsilon = 1e-3);
    assert_relative_eq!(result.bic, 424.8929, epsilon = 1e-3);
}

#[test]
fn test_stackloss_matches_r() {
    // lm(stack.loss ~ ., data = stackloss)
    let data = datasets::stackloss();
    let x = data.design(&["air_flow", "water_temp", "acid_conc"]).expect("columns");
    let y = data.column("stack_loss").expect("column");

    let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("fit should succeed");
    let result = fitted.result();

    assert_relative_eq!(result.intercept.expect("intercept"), -39.9197, epsilon = 1e-4);
    assert_relative_eq!(result.coefficients[0], 0.7156, epsilon = 1e-4);
    assert_relative_eq!(result.coefficients[1], 1.2953, epsilon = 1e-4);
    assert_relative_eq!(result.coefficients[2], -0.1521, epsilon = 1e-4);

    let se = result.std_errors.as_ref().expect("se");
    assert_relative_eq!(se[0], 0.1349, epsilon = 1e-4);
    assert_relative_eq!(se[1], 0.3680, epsilon = 1e-4);
    assert_relative_eq!(se[2], 0.1563, epsilon = 1e-4);
    assert_relative_eq!(result.sigma, 3.243, epsilon = 1e-3);
    assert_relative_eq!(result.r_squared, 0.9136, epsilon = 1e-4);
}

#[test]
fn test_blaisdell_residuals_are_autocorrelated() {
    let data = datasets::blaisdell();
    let x = data.design(&["industry"]).expect("column");
    let y = data.column("company").expect("column");

    let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("fit should succeed");

    assert_relative_eq!(fitted.intercept().expect("intercept"), -1.4548, epsilon = 1e-4);
    assert_relative_eq!(fitted.coefficients()[0], 0.17628, epsilon = 1e-5);

    let dw = durbin_watson(fitted.residuals()).expect("durbin-watson");
    assert_relative_eq!(dw, 0.735, epsilon = 1e-3);
}

// ============================================================================
// Aliasing
// ============================================================================

#[test]
fn test_collinear_column_is_aliased() {
    let (x, y) = common::generate_collinear_data(20);
    let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("fit should succeed");
    let result = fitted.result();

    assert!(result.has_aliased());
    assert_eq!(result.aliased, vec![false, true, false]);
    assert!(result.coefficients[1].is_nan());
    assert_eq!(result.rank, 2);
    assert_eq!(result.n_parameters, 3);
    assert_eq!(result.n_active_coefficients(), 3);
    assert_eq!(result.get_coefficient(1), None);
    assert_relative_eq!(result.coefficients[0], 2.0, epsilon = 1e-8);
    assert_relative_eq!(result.coefficients[2], 3.0, epsilon = 1e-8);

    // Predictions ignore the aliased column
    let x_new = Mat::from_fn(1, 3, |_, j| [2.0, 100.0, 4.0][j]);
    assert_relative_eq!(fitted.predict(&x_new)[0], 1.0 + 4.0 + 12.0, epsilon = 1e-8);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_dimension_mismatch() {
    let x = Mat::from_fn(5, 1, |i, _| i as f64);
    let y = Col::from_fn(4, |i| i as f64);
    assert!(matches!(
        OlsRegressor::builder().build().fit(&x, &y),
        Err(RegressionError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_non_finite_data_rejected() {
    let x = Mat::from_fn(5, 1, |i, _| if i == 2 { f64::NAN } else { i as f64 });
    let y = Col::from_fn(5, |i| i as f64);
    assert!(matches!(
        OlsRegressor::builder().build().fit(&x, &y),
        Err(RegressionError::NonFiniteData)
    ));
}

#[test]
fn test_invalid_confidence_level_rejected() {
    let x = Mat::from_fn(5, 1, |i, _| i as f64);
    let y = Col::from_fn(5, |i| i as f64);
    let model = OlsRegressor::builder().confidence_level(1.5).build();
    assert!(matches!(
        model.fit(&x, &y),
        Err(RegressionError::InvalidOptions(_))
    ));
}

// ============================================================================
// Summary
// ============================================================================

#[test]
fn test_summary_names_rows() {
    let cars = datasets::cars();
    let x = cars.design(&["speed"]).expect("column");
    let y = cars.column("dist").expect("column");
    let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("fit should succeed");

    let summary = ModelSummary::from_fitted("lm(dist ~ speed)", &fitted, &["speed"]);
    let speed = summary.coefficient("speed").expect("row");
    assert_relative_eq!(speed.t_value, 9.464, epsilon = 1e-3);
    assert!(speed.p_value < 1e-11);

    let text = summary.to_string();
    assert!(text.contains("Residual standard error"));
    assert!(text.contains("on 48 degrees of freedom"));
    assert!(text.contains("***"));
}

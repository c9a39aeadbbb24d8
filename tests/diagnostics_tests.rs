//! Diagnostic tests on fitted models, checked against R
//! (`influence.measures`, `acf`, `Box.test`, `lmtest::bptest`, `alr3::pureErrorAnova`).

mod common;

use approx::assert_relative_eq;
use faer::{Col, Mat};
use regression_remedies::datasets;
use regression_remedies::diagnostics::{
    acf, acf_confidence_bound, breusch_pagan, compute_leverage, durbin_watson,
    high_leverage_points, lack_of_fit_test, ljung_box, nested_f_test, pacf, press_residuals,
    DiagnosticError, InfluenceMeasures,
};
use regression_remedies::prelude::*;
use regression_remedies::solvers::FittedOls;
use regression_remedies::utils::{select_entries, select_rows};

fn cars_fit() -> (Mat<f64>, Col<f64>, FittedOls) {
    let cars = datasets::cars();
    let x = cars.design(&["speed"]).expect("column");
    let y = cars.column("dist").expect("column");
    let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("fit should succeed");
    (x, y, fitted)
}

// ============================================================================
// Leverage and Influence
// ============================================================================

#[test]
fn test_leverage_matches_hatvalues() {
    let (x, _, _) = cars_fit();
    let h = compute_leverage(&x, true);

    // hatvalues(lm(dist ~ speed, cars))[1]
    assert_relative_eq!(h[0], 0.114861, epsilon = 1e-6);
    // Trace of the hat matrix is p
    assert_relative_eq!(h.iter().sum::<f64>(), 2.0, epsilon = 1e-10);
    assert!(high_leverage_points(&h, 2, None).contains(&0));
}

#[test]
fn test_influence_measures_match_r() {
    let (x, _, fitted) = cars_fit();
    let influence = InfluenceMeasures::compute(&x, fitted.result());

    let worst = (0..50)
        .max_by(|&a, &b| influence.cooks_distance[a].total_cmp(&influence.cooks_distance[b]))
        .expect("non-empty");
    assert_eq!(worst, 48);
    assert_relative_eq!(influence.cooks_distance[48], 0.340396, epsilon = 1e-5);
    assert_relative_eq!(influence.studentized[48], 2.919060, epsilon = 1e-5);
    assert_relative_eq!(influence.external_studentized[48], 3.184993, epsilon = 1e-5);
    assert_relative_eq!(influence.dffits[48], 0.900270, epsilon = 1e-5);

    assert!(influence.influential().contains(&48));
}

#[test]
fn test_dfbetas_match_case_deletion() {
    let (x, y, fitted) = cars_fit();
    let influence = InfluenceMeasures::compute(&x, fitted.result());
    let xtx_inv = fitted.xtx_inverse().expect("full rank");

    for i in [0, 22, 48] {
        let keep: Vec<usize> = (0..50).filter(|&r| r != i).collect();
        let reduced = OlsRegressor::builder()
            .build()
            .fit(&select_rows(&x, &keep), &select_entries(&y, &keep))
            .expect("fit should succeed");
        let s_i = reduced.result().sigma;

        let d0 = (fitted.intercept().expect("b0") - reduced.intercept().expect("b0"))
            / (s_i * xtx_inv[(0, 0)].sqrt());
        let d1 = (fitted.coefficients()[0] - reduced.coefficients()[0]) / (s_i * xtx_inv[(1, 1)].sqrt());
        assert_relative_eq!(influence.dfbetas[(i, 0)], d0, epsilon = 1e-8);
        assert_relative_eq!(influence.dfbetas[(i, 1)], d1, epsilon = 1e-8);
    }
}

#[test]
fn test_press_residuals_are_deleted_prediction_errors() {
    let (x, y, fitted) = cars_fit();
    let h = compute_leverage(&x, true);
    let press = press_residuals(fitted.residuals(), &h);

    let i = 22;
    let keep: Vec<usize> = (0..50).filter(|&r| r != i).collect();
    let reduced = OlsRegressor::builder()
        .build()
        .fit(&select_rows(&x, &keep), &select_entries(&y, &keep))
        .expect("fit should succeed");
    let x_i = Mat::from_fn(1, 1, |_, _| x[(i, 0)]);
    assert_relative_eq!(press[i], y[i] - reduced.predict(&x_i)[0], epsilon = 1e-8);
}

// ============================================================================
// Serial Correlation
// ============================================================================

#[test]
fn test_autocorrelation_of_cars_residuals() {
    let (_, _, fitted) = cars_fit();
    let e = fitted.residuals();

    let r = acf(e, 3).expect("acf");
    assert_relative_eq!(r[0], 1.0, epsilon = 1e-12);
    assert_relative_eq!(r[1], 0.160432, epsilon = 1e-6);
    assert_relative_eq!(r[2], -0.131486, epsilon = 1e-6);

    let partial = pacf(e, 3).expect("pacf");
    assert_relative_eq!(partial[0], r[1], epsilon = 1e-12);

    // Box.test(resid, lag = 3, type = "Ljung")
    let lb = ljung_box(e, 3, 0).expect("ljung-box");
    assert_relative_eq!(lb.statistic, 2.351579, epsilon = 1e-5);
    assert_eq!(lb.df, 3);
    assert!(lb.p_value > 0.4);

    assert_relative_eq!(durbin_watson(e).expect("dw"), 1.676225, epsilon = 1e-6);
    assert_relative_eq!(acf_confidence_bound(50, 0.95), 1.959964 / 50f64.sqrt(), epsilon = 1e-6);
}

#[test]
fn test_ar1_residuals_are_detected() {
    let data = datasets::ar1_sales(200, 0.8, 12).expect("valid parameters");
    let x = data.design(&["industry"]).expect("column");
    let y = data.column("company").expect("column");
    let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("fit should succeed");

    let r = acf(fitted.residuals(), 2).expect("acf");
    assert!(r[1] > 0.6);
    let partial = pacf(fitted.residuals(), 3).expect("pacf");
    // An AR(1) process cuts off after the first partial autocorrelation
    assert!(partial[1].abs() < 3.0 * acf_confidence_bound(200, 0.95));
    assert!(ljung_box(fitted.residuals(), 10, 0).expect("lb").p_value < 1e-6);
    assert!(durbin_watson(fitted.residuals()).expect("dw") < 1.0);
}

#[test]
fn test_invalid_lags() {
    let e = Col::from_fn(5, |i| i as f64);
    assert!(matches!(acf(&e, 5), Err(DiagnosticError::InvalidLag(_))));
    assert!(matches!(pacf(&e, 0), Err(DiagnosticError::InvalidLag(_))));
    assert!(matches!(ljung_box(&e, 2, 2), Err(DiagnosticError::InvalidLag(_))));
}

// ============================================================================
// Heteroscedasticity and Lack of Fit
// ============================================================================

#[test]
fn test_breusch_pagan_matches_bptest() {
    let (x, _, fitted) = cars_fit();
    let bp = breusch_pagan(&x, fitted.residuals()).expect("bp");

    // bptest(lm(dist ~ speed, cars)): BP = 3.2149, df = 1, p-value = 0.07297
    assert_relative_eq!(bp.statistic, 3.214880, epsilon = 1e-5);
    assert_eq!(bp.df, 1);
    assert_relative_eq!(bp.p_value, 0.07297, epsilon = 1e-4);
}

#[test]
fn test_breusch_pagan_on_heteroscedastic_data() {
    let (x, y) = common::generate_heteroscedastic_data(150, 2);
    let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("fit should succeed");
    let bp = breusch_pagan(&x, fitted.residuals()).expect("bp");
    assert!(bp.p_value < 0.01);
}

#[test]
fn test_lack_of_fit_cars() {
    let (x, y, fitted) = cars_fit();
    let lof = lack_of_fit_test(&x, &y, &fitted).expect("lack of fit");

    assert_eq!(lof.groups, 19);
    assert_eq!(lof.df_lack_of_fit, 17);
    assert_eq!(lof.df_pure_error, 31);
    assert_relative_eq!(lof.pure_error_ss, 6764.783333, epsilon = 1e-5);
    assert_relative_eq!(lof.sse, 11353.521051, epsilon = 1e-5);
    assert_relative_eq!(lof.f_statistic, 1.236950, epsilon = 1e-5);
    assert!(lof.p_value > 0.2 && lof.p_value < 0.4);

    let table = lof.to_string();
    assert!(table.contains("Lack of fit"));
    assert!(table.contains("Pure error"));
}

#[test]
fn test_nested_models_quadratic_term() {
    let (x, y, linear) = cars_fit();
    let x2 = Mat::from_fn(50, 2, |i, j| if j == 0 { x[(i, 0)] } else { x[(i, 0)].powi(2) });
    let quadratic = OlsRegressor::builder().build().fit(&x2, &y).expect("fit should succeed");

    let test = nested_f_test(&linear, &quadratic).expect("nested test");
    assert_eq!(test.df_reduced, 48);
    assert_eq!(test.df_full, 47);
    // t² of the quadratic coefficient equals the extra-sum-of-squares F
    let t = quadratic.result().t_statistics.as_ref().expect("t")[1];
    assert_relative_eq!(test.f_statistic, t * t, epsilon = 1e-8);

    assert!(matches!(
        nested_f_test(&quadratic, &linear),
        Err(DiagnosticError::NotNested(_))
    ));
}

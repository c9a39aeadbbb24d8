//! Tests for prediction intervals validated against R's predict() function.

mod common;

use approx::assert_relative_eq;
use faer::{Col, Mat};
use regression_remedies::datasets;
use regression_remedies::prelude::*;

fn cars() -> (Mat<f64>, Col<f64>) {
    let data = datasets::cars();
    (
        data.design(&["speed"]).expect("column"),
        data.column("dist").expect("column"),
    )
}

/// R code:
/// ```r
/// fit <- lm(dist ~ speed, data = cars)
/// predict(fit, data.frame(speed = c(10, 21)), interval = "confidence")
/// predict(fit, data.frame(speed = c(10, 21)), interval = "prediction")
/// ```
#[test]
fn test_ols_intervals_vs_r() {
    let (x, y) = cars();
    let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("fit should succeed");
    let x_new = Mat::from_fn(2, 1, |i, _| [10.0, 21.0][i]);

    let conf = fitted.predict_with_interval(&x_new, Some(IntervalType::Confidence), 0.95);
    assert_relative_eq!(conf.fit[0], 21.74499, epsilon = 1e-4);
    assert_relative_eq!(conf.lower[0], 15.46192, epsilon = 1e-4);
    assert_relative_eq!(conf.upper[0], 28.02807, epsilon = 1e-4);
    assert_relative_eq!(conf.se[1], 3.185116, epsilon = 1e-5);

    let pred = fitted.predict_with_interval(&x_new, Some(IntervalType::Prediction), 0.95);
    assert_relative_eq!(pred.fit[1], 65.00149, epsilon = 1e-4);
    assert_relative_eq!(pred.lower[1], 33.42257, epsilon = 1e-4);
    assert_relative_eq!(pred.upper[1], 96.58040, epsilon = 1e-4);
    assert_eq!(pred.interval, Some(IntervalType::Prediction));
}

#[test]
fn test_prediction_wider_than_confidence() {
    let (x, y, _) = common::generate_linear_data(30, 2, 1.0, 0.5, 99);
    let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("fit should succeed");
    let x_new = Mat::from_fn(4, 2, |i, j| 0.25 * (i + j) as f64);

    let conf = fitted.predict_with_interval(&x_new, Some(IntervalType::Confidence), 0.95);
    let pred = fitted.predict_with_interval(&x_new, Some(IntervalType::Prediction), 0.95);
    for i in 0..4 {
        assert!(pred.width(i) > conf.width(i));
        assert_relative_eq!(pred.fit[i], conf.fit[i], epsilon = 1e-12);
    }

    // Higher level, wider interval
    let wide = fitted.predict_with_interval(&x_new, Some(IntervalType::Prediction), 0.99);
    assert!(wide.width(0) > pred.width(0));
}

#[test]
fn test_point_only_without_interval() {
    let (x, y) = cars();
    let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("fit should succeed");
    let x_new = Mat::from_fn(1, 1, |_, _| 15.0);

    let result = fitted.predict_with_interval(&x_new, None, 0.95);
    assert!(!result.has_intervals());
    assert_eq!(result.lower[0], result.fit[0]);
    assert_eq!(result.se[0], 0.0);
}

#[test]
fn test_gls_and_robust_intervals_are_finite() {
    let data = datasets::blaisdell();
    let x = data.design(&["industry"]).expect("column");
    let y = data.column("company").expect("column");
    let x_new = Mat::from_fn(1, 1, |_, _| 175.0);

    let gls = GlsRegressor::builder().build().fit(&x, &y).expect("gls fit");
    let robust = RobustRegressor::builder().build().fit(&x, &y).expect("rlm fit");

    for pred in [
        gls.predict_with_interval(&x_new, Some(IntervalType::Prediction), 0.95),
        robust.predict_with_interval(&x_new, Some(IntervalType::Prediction), 0.95),
    ] {
        assert!(pred.lower[0].is_finite() && pred.upper[0].is_finite());
        assert!(pred.lower[0] < pred.fit[0] && pred.fit[0] < pred.upper[0]);
    }
}

#[test]
fn test_quantile_intervals_are_unavailable() {
    let (x, y) = cars();
    let fitted = QuantileRegressor::builder().tau(0.5).build().fit(&x, &y).expect("rq fit");
    let x_new = Mat::from_fn(2, 1, |i, _| 10.0 + i as f64);

    let result = fitted.predict_with_interval(&x_new, Some(IntervalType::Confidence), 0.95);
    assert_relative_eq!(result.fit[0], fitted.predict(&x_new)[0], epsilon = 1e-12);
    assert!(result.lower[0].is_nan() && result.upper[1].is_nan());
}

//! Simulated designs shared by the integration tests.
#![allow(dead_code)]

use faer::{Col, Mat};
use rand::prelude::*;
use rand_distr::StandardNormal;

/// Generate linear data: y = intercept + Σ (j + 1) x_j + noise_std * N(0, 1).
pub fn generate_linear_data(
    n_samples: usize,
    n_features: usize,
    intercept: f64,
    noise_std: f64,
    seed: u64,
) -> (Mat<f64>, Col<f64>, Col<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let draws: Vec<f64> = (0..n_samples * n_features)
        .map(|_| rng.gen_range(-1.0..1.0))
        .collect();
    let noise: Vec<f64> = (0..n_samples).map(|_| rng.sample(StandardNormal)).collect();

    let x = Mat::from_fn(n_samples, n_features, |i, j| draws[i * n_features + j]);
    let true_coefficients = Col::from_fn(n_features, |j| (j + 1) as f64);
    let y = Col::from_fn(n_samples, |i| {
        let signal: f64 = (0..n_features).map(|j| x[(i, j)] * true_coefficients[j]).sum();
        intercept + signal + noise_std * noise[i]
    });

    (x, y, true_coefficients)
}

/// Generate a straight line with the error standard deviation growing with x.
pub fn generate_heteroscedastic_data(n_samples: usize, seed: u64) -> (Mat<f64>, Col<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise: Vec<f64> = (0..n_samples).map(|_| rng.sample(StandardNormal)).collect();
    let x = Mat::from_fn(n_samples, 1, |i, _| 5.0 + i as f64 * 0.5);
    let y = Col::from_fn(n_samples, |i| 3.0 + 2.0 * x[(i, 0)] + 0.3 * x[(i, 0)] * noise[i]);
    (x, y)
}

/// Three predictors where the second is exactly twice the first;
/// y = 1 + 2 x₀ + 3 x₂ with no noise.
pub fn generate_collinear_data(n_samples: usize) -> (Mat<f64>, Col<f64>) {
    let x = Mat::from_fn(n_samples, 3, |i, j| {
        let t = i as f64;
        [t, 2.0 * t, t * t][j]
    });
    let y = Col::from_fn(n_samples, |i| 1.0 + 2.0 * x[(i, 0)] + 3.0 * x[(i, 2)]);
    (x, y)
}

/// Contaminate `y` at the given rows by adding `shift`.
pub fn contaminate(y: &Col<f64>, rows: &[usize], shift: f64) -> Col<f64> {
    Col::from_fn(y.nrows(), |i| if rows.contains(&i) { y[i] + shift } else { y[i] })
}

//! Dense helpers for designs, cross products and their inverses.

use faer::{Col, Mat};

/// Columns whose entries all lie within `tolerance` of the first row.
/// With an intercept such a column carries no information of its own.
pub fn constant_columns(x: &Mat<f64>, tolerance: f64) -> Vec<bool> {
    (0..x.ncols())
        .map(|j| match x.nrows() {
            0 => true,
            n => (1..n).all(|i| (x[(i, j)] - x[(0, j)]).abs() < tolerance),
        })
        .collect()
}

/// The matrix the estimators actually fit: `[1 | X]` with an intercept.
pub fn design_matrix(x: &Mat<f64>, with_intercept: bool) -> Mat<f64> {
    let shift = usize::from(with_intercept);
    Mat::from_fn(x.nrows(), x.ncols() + shift, |i, j| match j.checked_sub(shift) {
        Some(col) => x[(i, col)],
        None => 1.0,
    })
}

/// Keep only the listed rows, in the given order.
pub fn select_rows(x: &Mat<f64>, rows: &[usize]) -> Mat<f64> {
    Mat::from_fn(rows.len(), x.ncols(), |i, j| x[(rows[i], j)])
}

/// Keep only the listed entries, in the given order.
pub fn select_entries(y: &Col<f64>, rows: &[usize]) -> Col<f64> {
    Col::from_fn(rows.len(), |i| y[rows[i]])
}

/// Weighted column means and weighted mean of `y`.
///
/// With `weights = None` these are ordinary means.
pub fn weighted_means(x: &Mat<f64>, y: &Col<f64>, weights: Option<&Col<f64>>) -> (Col<f64>, f64) {
    let n = x.nrows();
    let w = |i: usize| weights.map_or(1.0, |w| w[i]);
    let sum_w: f64 = (0..n).map(&w).sum();

    let x_means = Col::from_fn(x.ncols(), |j| {
        (0..n).map(|i| w(i) * x[(i, j)]).sum::<f64>() / sum_w
    });
    let y_mean = (0..n).map(|i| w(i) * y[i]).sum::<f64>() / sum_w;

    (x_means, y_mean)
}

/// `X'WX`, or `X'X` when `weights` is `None`.
fn cross_product(x: &Mat<f64>, weights: Option<&Col<f64>>) -> Mat<f64> {
    match weights {
        None => x.transpose() * x,
        Some(w) => {
            let xw = Mat::from_fn(x.nrows(), x.ncols(), |i, j| w[i] * x[(i, j)]);
            x.transpose() * &xw
        }
    }
}

/// Inverse of a symmetric positive definite matrix through faer's QR.
///
/// `None` when an `|R_ii|` falls below `1e-12` times the largest diagonal
/// entry of `a`, i.e. the matrix is singular to working precision.
pub fn invert_symmetric(a: &Mat<f64>) -> Option<Mat<f64>> {
    let n = a.nrows();
    if n == 0 || a.ncols() != n {
        return None;
    }
    let scale = (0..n).map(|i| a[(i, i)].abs()).fold(0.0_f64, f64::max);
    if !(scale > 0.0) {
        return None;
    }

    let qr = a.qr();
    let q = qr.compute_Q();
    let r = qr.R();
    if (0..n).any(|i| !(r[(i, i)].abs() > 1e-12 * scale)) {
        return None;
    }

    // R X = Q', one column of the inverse at a time
    let qt = q.transpose();
    let mut inv = Mat::<f64>::zeros(n, n);
    for col in 0..n {
        for i in (0..n).rev() {
            let mut sum = qt[(i, col)];
            for j in (i + 1)..n {
                sum -= r[(i, j)] * inv[(j, col)];
            }
            inv[(i, col)] = sum / r[(i, i)];
        }
    }

    // Symmetrize away rounding
    Some(Mat::from_fn(n, n, |i, j| 0.5 * (inv[(i, j)] + inv[(j, i)])))
}

/// Invert `X'WX` restricted to the active columns of the design.
///
/// Inactive (aliased) rows and columns of the returned matrix are NaN.
pub fn inverse_cross_product(
    design: &Mat<f64>,
    weights: Option<&Col<f64>>,
    active: &[bool],
) -> Option<Mat<f64>> {
    let p = design.ncols();
    let cols: Vec<usize> = (0..p).filter(|&j| active[j]).collect();
    if cols.is_empty() {
        return None;
    }

    let reduced = Mat::from_fn(design.nrows(), cols.len(), |i, j| design[(i, cols[j])]);
    let inv_reduced = invert_symmetric(&cross_product(&reduced, weights))?;

    let mut inv = Mat::from_fn(p, p, |_, _| f64::NAN);
    for (a, &i) in cols.iter().enumerate() {
        for (b, &j) in cols.iter().enumerate() {
            inv[(i, j)] = inv_reduced[(a, b)];
        }
    }
    Some(inv)
}

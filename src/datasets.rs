//! Bundled example datasets.
//!
//! Values of `cars`, `stackloss` and `women` are those shipped with R's
//! `datasets` package. `blaisdell` is the quarterly company and industry
//! sales series from Kutner et al., *Applied Linear Statistical Models*,
//! Table 12.2. `ar1_sales` simulates data of the same shape with a chosen
//! AR(1) error correlation.

use faer::{Col, Mat};
use rand::prelude::*;
use rand_distr::StandardNormal;
use thiserror::Error;

/// Errors from dataset access.
#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("no columns selected")]
    EmptySelection,

    #[error("column '{name}' has {got} values, expected {expected}")]
    RaggedColumn {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// A table of named numeric columns; rows are observations.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    columns: Vec<String>,
    data: Mat<f64>,
}

impl Dataset {
    /// Build a dataset from named columns of equal length.
    pub fn from_columns(name: &str, columns: &[(&str, &[f64])]) -> Result<Self, DatasetError> {
        let n = columns.first().map_or(0, |(_, v)| v.len());
        for (col, values) in columns {
            if values.len() != n {
                return Err(DatasetError::RaggedColumn {
                    name: col.to_string(),
                    expected: n,
                    got: values.len(),
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            columns: columns.iter().map(|(c, _)| c.to_string()).collect(),
            data: Mat::from_fn(n, columns.len(), |i, j| columns[j].1[i]),
        })
    }

    /// Dataset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column names in storage order.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.data.ncols()
    }

    fn index(&self, name: &str) -> Result<usize, DatasetError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DatasetError::UnknownColumn(name.to_string()))
    }

    /// Copy of one column.
    pub fn column(&self, name: &str) -> Result<Col<f64>, DatasetError> {
        let j = self.index(name)?;
        Ok(Col::from_fn(self.n_rows(), |i| self.data[(i, j)]))
    }

    /// Design matrix of the named columns, in the given order, without an
    /// intercept column.
    pub fn design(&self, names: &[&str]) -> Result<Mat<f64>, DatasetError> {
        if names.is_empty() {
            return Err(DatasetError::EmptySelection);
        }
        let idx = names
            .iter()
            .map(|name| self.index(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Mat::from_fn(self.n_rows(), idx.len(), |i, j| {
            self.data[(i, idx[j])]
        }))
    }

    /// Copy with rows ordered by one column (stable, ascending).
    pub fn sort_by(&self, name: &str) -> Result<Self, DatasetError> {
        let j = self.index(name)?;
        let mut order: Vec<usize> = (0..self.n_rows()).collect();
        order.sort_by(|&a, &b| self.data[(a, j)].total_cmp(&self.data[(b, j)]));

        Ok(Self {
            name: self.name.clone(),
            columns: self.columns.clone(),
            data: Mat::from_fn(self.n_rows(), self.n_columns(), |i, k| {
                self.data[(order[i], k)]
            }),
        })
    }
}

fn bundled(name: &str, columns: &[(&str, &[f64])]) -> Dataset {
    Dataset {
        name: name.to_string(),
        columns: columns.iter().map(|(c, _)| c.to_string()).collect(),
        data: Mat::from_fn(columns[0].1.len(), columns.len(), |i, j| columns[j].1[i]),
    }
}

/// Speed (mph) and stopping distance (ft) of 50 cars from the 1920s.
///
/// Distances fan out as speed grows and most speeds are replicated, which
/// makes it the usual example for WLS and lack-of-fit tests.
pub fn cars() -> Dataset {
    const SPEED: [f64; 50] = [
        4.0, 4.0, 7.0, 7.0, 8.0, 9.0, 10.0, 10.0, 10.0, 11.0, 11.0, 12.0, 12.0, 12.0, 12.0, 13.0,
        13.0, 13.0, 13.0, 14.0, 14.0, 14.0, 14.0, 15.0, 15.0, 15.0, 16.0, 16.0, 17.0, 17.0, 17.0,
        18.0, 18.0, 18.0, 18.0, 19.0, 19.0, 19.0, 20.0, 20.0, 20.0, 20.0, 20.0, 22.0, 23.0, 24.0,
        24.0, 24.0, 24.0, 25.0,
    ];
    const DIST: [f64; 50] = [
        2.0, 10.0, 4.0, 22.0, 16.0, 10.0, 18.0, 26.0, 34.0, 17.0, 28.0, 14.0, 20.0, 24.0, 28.0,
        26.0, 34.0, 34.0, 46.0, 26.0, 36.0, 60.0, 80.0, 20.0, 26.0, 54.0, 32.0, 40.0, 32.0, 40.0,
        50.0, 42.0, 56.0, 76.0, 84.0, 36.0, 46.0, 68.0, 32.0, 48.0, 52.0, 56.0, 64.0, 66.0, 54.0,
        70.0, 92.0, 93.0, 120.0, 85.0,
    ];
    bundled("cars", &[("speed", &SPEED[..]), ("dist", &DIST[..])])
}

/// Brownlee's stack loss plant data: 21 days of operation.
pub fn stackloss() -> Dataset {
    const AIR_FLOW: [f64; 21] = [
        80.0, 80.0, 75.0, 62.0, 62.0, 62.0, 62.0, 62.0, 58.0, 58.0, 58.0, 58.0, 58.0, 58.0, 50.0,
        50.0, 50.0, 50.0, 50.0, 56.0, 70.0,
    ];
    const WATER_TEMP: [f64; 21] = [
        27.0, 27.0, 25.0, 24.0, 22.0, 23.0, 24.0, 24.0, 23.0, 18.0, 18.0, 17.0, 18.0, 19.0, 18.0,
        18.0, 19.0, 19.0, 20.0, 20.0, 20.0,
    ];
    const ACID_CONC: [f64; 21] = [
        89.0, 88.0, 90.0, 87.0, 87.0, 87.0, 93.0, 93.0, 87.0, 80.0, 89.0, 88.0, 82.0, 93.0, 89.0,
        86.0, 72.0, 79.0, 80.0, 82.0, 91.0,
    ];
    const STACK_LOSS: [f64; 21] = [
        42.0, 37.0, 37.0, 28.0, 18.0, 18.0, 19.0, 20.0, 15.0, 14.0, 14.0, 13.0, 11.0, 12.0, 8.0,
        7.0, 8.0, 8.0, 9.0, 15.0, 15.0,
    ];
    bundled(
        "stackloss",
        &[
            ("air_flow", &AIR_FLOW[..]),
            ("water_temp", &WATER_TEMP[..]),
            ("acid_conc", &ACID_CONC[..]),
            ("stack_loss", &STACK_LOSS[..]),
        ],
    )
}

/// Average heights (in) and weights (lb) of American women aged 30-39.
pub fn women() -> Dataset {
    const HEIGHT: [f64; 15] = [
        58.0, 59.0, 60.0, 61.0, 62.0, 63.0, 64.0, 65.0, 66.0, 67.0, 68.0, 69.0, 70.0, 71.0, 72.0,
    ];
    const WEIGHT: [f64; 15] = [
        115.0, 117.0, 120.0, 123.0, 126.0, 129.0, 132.0, 135.0, 139.0, 142.0, 146.0, 150.0, 154.0,
        159.0, 164.0,
    ];
    bundled("women", &[("height", &HEIGHT[..]), ("weight", &WEIGHT[..])])
}

/// Blaisdell Company quarterly sales against industry sales (20 quarters,
/// $ millions). Regression errors are positively autocorrelated.
pub fn blaisdell() -> Dataset {
    const COMPANY: [f64; 20] = [
        20.96, 21.40, 21.96, 21.52, 22.39, 22.76, 23.48, 23.66, 24.10, 24.01, 24.54, 24.30, 25.00,
        25.64, 26.36, 26.98, 27.52, 27.78, 28.24, 28.78,
    ];
    const INDUSTRY: [f64; 20] = [
        127.3, 130.0, 132.7, 129.4, 135.0, 137.1, 141.2, 142.8, 145.5, 145.3, 148.3, 146.4, 150.2,
        153.1, 157.3, 160.7, 164.2, 165.6, 168.7, 171.7,
    ];
    let time: Vec<f64> = (1..=20).map(f64::from).collect();
    bundled(
        "blaisdell",
        &[("time", time.as_slice()), ("industry", &INDUSTRY[..]), ("company", &COMPANY[..])],
    )
}

/// Simulated quarterly sales with AR(1) regression errors.
///
/// `industry` follows a noisy upward trend and
/// `company = -1.5 + 0.18 industry + εₜ`, where `εₜ = φ εₜ₋₁ + uₜ`,
/// `uₜ ~ N(0, 0.1²)` and ε₀ is drawn from the stationary distribution.
/// The same seed always produces the same data.
pub fn ar1_sales(n: usize, phi: f64, seed: u64) -> Result<Dataset, DatasetError> {
    if n < 3 {
        return Err(DatasetError::InvalidParameter(format!(
            "need at least 3 periods, got {n}"
        )));
    }
    if !(phi > -1.0 && phi < 1.0) {
        return Err(DatasetError::InvalidParameter(format!(
            "phi must be in (-1, 1), got {phi}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut normal = || -> f64 { rng.sample(StandardNormal) };
    let sd = 0.1;

    let mut time = Vec::with_capacity(n);
    let mut industry = Vec::with_capacity(n);
    let mut company = Vec::with_capacity(n);

    let mut level = 127.0;
    let mut error = normal() * sd / (1.0 - phi * phi).sqrt();
    for t in 0..n {
        if t > 0 {
            error = phi * error + sd * normal();
        }
        level += 2.2 + 1.5 * normal();
        time.push((t + 1) as f64);
        industry.push(level);
        company.push(-1.5 + 0.18 * level + error);
    }

    Dataset::from_columns(
        "ar1_sales",
        &[("time", time.as_slice()), ("industry", industry.as_slice()), ("company", company.as_slice())],
    )
}

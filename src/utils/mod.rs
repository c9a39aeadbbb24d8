//! Internal helpers shared by solvers and diagnostics.

mod matrix;
mod stats;

pub use matrix::{
    constant_columns, design_matrix, inverse_cross_product, invert_symmetric, select_entries,
    select_rows, weighted_means,
};
pub use stats::{argsort, mad_about_zero, mean, median, sample_variance};

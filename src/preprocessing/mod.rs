//! Data preprocessing module
//!
//! Turns raw transaction tables into numeric feature tables:
//! - Standard scaling of numeric columns
//! - One-hot encoding of categorical columns
//! - Conversion of feature tables and targets into `ndarray` inputs

mod encoder;
mod generator;
mod scaler;

pub use encoder::OneHotEncoder;
pub use generator::FeatureGenerator;
pub use scaler::StandardScaler;

use crate::error::{LtvError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Row-major matrix of every column of a feature table
pub fn to_matrix(df: &DataFrame) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let col_data: Vec<Vec<f64>> = df
        .get_column_names()
        .into_iter()
        .map(|name| {
            let values = scaler::numeric_values(df, name.as_str())?;
            values
                .into_iter()
                .map(|v| v.ok_or_else(|| LtvError::Data(format!("null in feature column '{}'", name))))
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Array2::from_shape_fn((n_rows, col_data.len()), |(r, c)| col_data[c][r]))
}

/// Target column as a float vector; nulls are rejected
pub fn extract_target(df: &DataFrame, target_col: &str) -> Result<Array1<f64>> {
    let values = scaler::numeric_values(df, target_col)?;
    let nulls = values.iter().filter(|v| v.is_none()).count();
    if nulls > 0 {
        return Err(LtvError::Data(format!(
            "target column '{}' has {} null value(s)",
            target_col, nulls
        )));
    }
    Ok(values.into_iter().flatten().collect())
}

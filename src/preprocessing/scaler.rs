//! Standard (z-score) feature scaling

use crate::error::{LtvError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Parameters learned for one column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    column: String,
    center: f64,
    scale: f64,
}

/// Scales numeric columns to zero mean and unit variance.
///
/// Uses the population standard deviation. A constant column gets scale 1,
/// and nulls are imputed with the fitted mean, so they come out as 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the scaler to the given columns
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        self.params = columns
            .iter()
            .map(|name| {
                let values = numeric_values(df, name)?;
                let present: Vec<f64> = values.iter().flatten().copied().collect();
                let (center, scale) = mean_and_std(&present);
                Ok(ScalerParams {
                    column: name.clone(),
                    center,
                    scale: if scale == 0.0 { 1.0 } else { scale },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.is_fitted = true;
        Ok(self)
    }

    /// Scaled columns, in fitted order
    pub fn transform(&self, df: &DataFrame) -> Result<Vec<Column>> {
        if !self.is_fitted {
            return Err(LtvError::NotFitted("StandardScaler"));
        }

        self.params
            .iter()
            .map(|p| {
                let scaled: Vec<f64> = numeric_values(df, &p.column)?
                    .into_iter()
                    .map(|v| (v.unwrap_or(p.center) - p.center) / p.scale)
                    .collect();
                Ok(Column::new(p.column.as_str().into(), scaled))
            })
            .collect()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.column.as_str())
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

/// Read a column as optional floats, casting integers and the like
pub(crate) fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| LtvError::FeatureNotFound(name.to_string()))?;
    let casted = column
        .cast(&DataType::Float64)
        .map_err(|e| LtvError::Data(format!("column '{}' is not numeric: {}", name, e)))?;
    let values = casted
        .as_materialized_series()
        .f64()
        .map_err(|e| LtvError::Data(e.to_string()))?
        .into_iter()
        .collect();
    Ok(values)
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 1.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

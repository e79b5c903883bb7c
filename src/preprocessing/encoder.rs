//! One-hot categorical encoding

use crate::error::{LtvError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Categories learned for one column, sorted
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnCategories {
    column: String,
    categories: Vec<String>,
}

/// One-hot encoder that ignores unknown categories.
///
/// Each fitted column expands to one indicator column per category seen
/// during fit, named `<column>_<category>`. Nulls and categories not seen
/// during fit encode as an all-zero row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    mappings: Vec<ColumnCategories>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the encoder to the given columns
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        self.mappings = columns
            .iter()
            .map(|name| {
                let categories: BTreeSet<String> =
                    string_values(df, name)?.into_iter().flatten().collect();
                Ok(ColumnCategories {
                    column: name.clone(),
                    categories: categories.into_iter().collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.is_fitted = true;
        Ok(self)
    }

    /// Indicator columns, in fitted order
    pub fn transform(&self, df: &DataFrame) -> Result<Vec<Column>> {
        if !self.is_fitted {
            return Err(LtvError::NotFitted("OneHotEncoder"));
        }

        let mut out = Vec::with_capacity(self.feature_names().len());
        for mapping in &self.mappings {
            let values = string_values(df, &mapping.column)?;
            let positions: HashMap<&str, usize> = mapping
                .categories
                .iter()
                .enumerate()
                .map(|(i, c)| (c.as_str(), i))
                .collect();

            let codes: Vec<Option<usize>> = values
                .iter()
                .map(|v| v.as_deref().and_then(|s| positions.get(s).copied()))
                .collect();

            let unknown = values
                .iter()
                .zip(&codes)
                .filter(|(v, code)| v.is_some() && code.is_none())
                .count();
            if unknown > 0 {
                debug!("{} unseen value(s) in '{}' encoded as zeros", unknown, mapping.column);
            }

            for (i, category) in mapping.categories.iter().enumerate() {
                let indicator: Vec<f64> = codes
                    .iter()
                    .map(|code| if *code == Some(i) { 1.0 } else { 0.0 })
                    .collect();
                let name = one_hot_name(&mapping.column, category);
                out.push(Column::new(name.into(), indicator));
            }
        }

        Ok(out)
    }

    /// Generated column names, in output order
    pub fn feature_names(&self) -> Vec<String> {
        self.mappings
            .iter()
            .flat_map(|m| m.categories.iter().map(move |c| one_hot_name(&m.column, c)))
            .collect()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.mappings.iter().map(|m| m.column.as_str())
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

fn one_hot_name(column: &str, category: &str) -> String {
    format!("{}_{}", column, category)
}

/// Read a column as optional strings, casting non-string dtypes
fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| LtvError::FeatureNotFound(name.to_string()))?;
    let casted = column
        .cast(&DataType::String)
        .map_err(|e| LtvError::Data(e.to_string()))?;
    let values = casted
        .as_materialized_series()
        .str()
        .map_err(|e| LtvError::Data(e.to_string()))?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

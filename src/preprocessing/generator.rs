//! Feature generation: column selection, scaling and one-hot encoding

use super::encoder::OneHotEncoder;
use super::scaler::StandardScaler;
use crate::config::FeaturesConfig;
use crate::error::{LtvError, Result};
use crate::export::{load_artifact, save_artifact};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// State frozen by `fit_transform`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedState {
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    feature_names: Vec<String>,
}

/// Turns a raw table into a numeric feature table.
///
/// Output columns are the declared numeric columns (scaled, declared order)
/// followed by one-hot indicators for the declared categorical columns.
/// The column set is fixed by [`FeatureGenerator::fit_transform`] and
/// reproduced exactly by every later [`FeatureGenerator::transform`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureGenerator {
    config: FeaturesConfig,
    fitted: Option<FittedState>,
}

impl FeatureGenerator {
    pub fn new(config: FeaturesConfig) -> Self {
        Self { config, fitted: None }
    }

    /// Fit the scaler and encoder on `df` and return its feature table
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        info!("Generating features...");

        let num_cols = self.select_columns(df, &self.config.numerical_cols, "numerical");
        let cat_cols = self.select_columns(df, &self.config.categorical_cols, "categorical");
        if num_cols.is_empty() && cat_cols.is_empty() {
            return Err(LtvError::Preprocessing(
                "none of the declared feature columns exist in the data".to_string(),
            ));
        }

        let mut scaler = StandardScaler::new();
        scaler.fit(df, &num_cols)?;
        let mut encoder = OneHotEncoder::new();
        encoder.fit(df, &cat_cols)?;

        let mut feature_names = num_cols;
        feature_names.extend(encoder.feature_names());
        info!(
            "Fitted {} feature columns ({} numeric, {} one-hot)",
            feature_names.len(),
            scaler.columns().count(),
            feature_names.len() - scaler.columns().count()
        );

        self.fitted = Some(FittedState { scaler, encoder, feature_names });
        self.transform(df)
    }

    /// Apply the already-fitted scaler and encoder to new data
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or(LtvError::NotFitted("FeatureGenerator"))?;

        let mut columns = fitted.scaler.transform(df)?;
        columns.extend(fitted.encoder.transform(df)?);
        Ok(DataFrame::new(columns)?)
    }

    /// Output column names; empty until fitted
    pub fn feature_names(&self) -> &[String] {
        self.fitted.as_ref().map(|f| f.feature_names.as_slice()).unwrap_or(&[])
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn config(&self) -> &FeaturesConfig {
        &self.config
    }

    /// Persist the fitted generator
    pub fn save(&self, path: &Path) -> Result<()> {
        if !self.is_fitted() {
            return Err(LtvError::NotFitted("FeatureGenerator"));
        }
        save_artifact(self, path)?;
        info!("Saved feature generator to {}", path.display());
        Ok(())
    }

    /// Load a generator persisted by [`FeatureGenerator::save`]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LtvError::NotFitted("FeatureGenerator (no artifact found, train first)"));
        }
        let generator: Self = load_artifact(path)?;
        if !generator.is_fitted() {
            return Err(LtvError::NotFitted("FeatureGenerator"));
        }
        Ok(generator)
    }

    /// Declared columns that are present and not reserved, in declared order
    fn select_columns(&self, df: &DataFrame, declared: &[String], role: &str) -> Vec<String> {
        let excluded = self.config.excluded_columns();
        let mut selected = Vec::with_capacity(declared.len());
        for name in declared {
            if excluded.contains(&name.as_str()) {
                warn!("Ignoring reserved column '{}' declared as {}", name, role);
            } else if df.column(name).is_err() {
                warn!("Dropping {} column '{}': not in data", role, name);
            } else if !selected.contains(name) {
                selected.push(name.clone());
            }
        }
        selected
    }
}

//! Pipeline configuration loaded from YAML
//!
//! ```yaml
//! data:
//!   raw_path: data/raw/transactions.csv
//! features:
//!   target_col: ltv
//!   categorical_cols: [country, channel]
//!   numerical_cols: [recency, frequency, monetary]
//! models:
//!   xgboost: { n_estimators: 200, max_depth: 4 }
//!   lightgbm: { n_estimators: 200, num_leaves: 31 }
//!   catboost: { iterations: 200, depth: 6 }
//! training:
//!   output_dir: models
//!   cv_folds: 5
//! ```

use crate::error::{LtvError, Result};
use crate::training::ModelKind;
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Config path used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

/// Top-level pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub features: FeaturesConfig,
    /// Hyperparameter mapping per model kind, keyed by kind name
    pub models: BTreeMap<String, Mapping>,
    pub training: TrainingConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub raw_path: PathBuf,
}

/// Column roles used by the feature generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    pub target_col: String,
    #[serde(default)]
    pub categorical_cols: Vec<String>,
    #[serde(default)]
    pub numerical_cols: Vec<String>,
    #[serde(default = "default_id_col")]
    pub id_col: String,
    #[serde(default = "default_date_col")]
    pub date_col: String,
}

impl FeaturesConfig {
    /// Columns that never become features
    pub fn excluded_columns(&self) -> [&str; 3] {
        [self.target_col.as_str(), self.id_col.as_str(), self.date_col.as_str()]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub output_dir: PathBuf,
    pub cv_folds: usize,
    /// Seed for fold shuffling
    #[serde(default = "default_seed")]
    pub random_seed: u64,
    /// Model kinds to train; all kinds when absent
    #[serde(default)]
    pub models: Option<Vec<String>>,
}

impl TrainingConfig {
    /// Kinds named by `models`, or all kinds, in fixed order without repeats
    pub fn model_kinds(&self) -> Result<Vec<ModelKind>> {
        let Some(names) = &self.models else {
            return Ok(ModelKind::ALL.to_vec());
        };
        let mut kinds = names
            .iter()
            .map(|name| name.parse::<ModelKind>())
            .collect::<Result<Vec<_>>>()?;
        kinds.sort();
        kinds.dedup();
        if kinds.is_empty() {
            return Err(LtvError::Config("training.models lists no model kinds".into()));
        }
        Ok(kinds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionConfig {
    #[serde(default = "default_predictions_path")]
    pub output_path: PathBuf,
    /// Fewer loadable models than this fails the run
    #[serde(default = "default_min_models")]
    pub min_models: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            output_path: default_predictions_path(),
            min_models: default_min_models(),
        }
    }
}

fn default_id_col() -> String {
    "customer_id".to_string()
}

fn default_date_col() -> String {
    "transaction_date".to_string()
}

fn default_seed() -> u64 {
    42
}

fn default_predictions_path() -> PathBuf {
    PathBuf::from("reports/predictions.csv")
}

fn default_min_models() -> usize {
    1
}

impl Config {
    /// Parse a configuration document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Hyperparameters declared for a model kind
    pub fn model_params(&self, kind: &str) -> Option<&Mapping> {
        self.models.get(kind)
    }
}

/// Load configuration from a YAML file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LtvError::Config(format!(
            "Config file not found at {}",
            path.display()
        )));
    }

    let yaml = std::fs::read_to_string(path)?;
    Config::from_yaml_str(&yaml)
}

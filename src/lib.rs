//! ltv360 - Customer lifetime value prediction pipeline
//!
//! Trains an ensemble of gradient-boosted regressors on transaction data
//! and produces averaged lifetime-value predictions.
//!
//! # Modules
//!
//! - [`config`] - YAML pipeline configuration
//! - [`utils`] - Data loading and CSV output
//! - [`preprocessing`] - Feature generation (scaling, one-hot encoding)
//! - [`training`] - Boosted regressors, cross-validation and the trainer
//! - [`inference`] - Ensemble predictor over saved models
//! - [`export`] - Versioned on-disk artifacts
//! - [`cli`] - Command-line interface

pub mod error;

pub mod config;
pub mod utils;

pub mod preprocessing;
pub mod training;
pub mod inference;

pub mod export;
pub mod cli;

pub use error::{LtvError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{load_config, Config};
    pub use crate::error::{LtvError, Result};
    pub use crate::inference::Predictor;
    pub use crate::preprocessing::{extract_target, FeatureGenerator};
    pub use crate::training::{ModelFactory, ModelKind, Regressor, Trainer};
    pub use crate::utils::{load_data, save_csv};
}

//! Ensemble predictor over the persisted model artifacts

use crate::config::Config;
use crate::error::{LtvError, Result};
use crate::export::{load_artifact, model_artifact_path};
use crate::preprocessing::to_matrix;
use crate::training::{BoostedModel, ModelKind, Regressor};
use ndarray::Array1;
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Name of the ensemble mean column
pub const AVERAGE_COLUMN: &str = "pred_avg";

/// Loads the trained regressors once and averages their predictions.
///
/// Starts unloaded; the first successful [`Predictor::load_models`] (or
/// [`Predictor::predict`]) moves it to loaded for good. Kinds whose artifact
/// is missing are skipped, so the average covers only the loaded models.
#[derive(Debug)]
pub struct Predictor {
    output_dir: PathBuf,
    kinds: Vec<ModelKind>,
    min_models: usize,
    models: BTreeMap<ModelKind, BoostedModel>,
}

impl Predictor {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            output_dir: config.training.output_dir.clone(),
            kinds: config.training.model_kinds()?,
            min_models: config.prediction.min_models,
            models: BTreeMap::new(),
        })
    }

    /// Load every available model artifact; returns how many are loaded
    pub fn load_models(&mut self) -> Result<usize> {
        if self.is_loaded() {
            return Ok(self.models.len());
        }

        let mut models = BTreeMap::new();
        for &kind in &self.kinds {
            let path = model_artifact_path(&self.output_dir, kind);
            if !path.exists() {
                warn!("Model file not found: {}", path.display());
                continue;
            }
            let model: BoostedModel = load_artifact(&path)?;
            if model.kind() != kind {
                return Err(LtvError::Serialization(format!(
                    "{} holds a {} model",
                    path.display(),
                    model.kind()
                )));
            }
            info!("Loaded {} model from {}", kind, path.display());
            models.insert(kind, model);
        }

        if models.is_empty() {
            return Err(LtvError::NoModelsAvailable(self.output_dir.display().to_string()));
        }
        if models.len() < self.min_models {
            return Err(LtvError::InsufficientModels {
                loaded: models.len(),
                required: self.min_models,
            });
        }

        self.models = models;
        Ok(self.models.len())
    }

    /// One `pred_<kind>` column per loaded model followed by `pred_avg`
    pub fn predict(&mut self, features: &DataFrame) -> Result<DataFrame> {
        self.load_models()?;
        let start = Instant::now();
        let x = to_matrix(features)?;

        let predictions = self
            .models
            .par_iter()
            .map(|(kind, model)| model.predict(&x).map(|p| (*kind, p)))
            .collect::<Result<Vec<(ModelKind, Array1<f64>)>>>()?;

        let mut sum = Array1::<f64>::zeros(x.nrows());
        let mut columns = Vec::with_capacity(predictions.len() + 1);
        for (kind, pred) in &predictions {
            sum += pred;
            columns.push(Column::new(kind.prediction_column().into(), pred.to_vec()));
        }
        let average = sum / predictions.len() as f64;
        columns.push(Column::new(AVERAGE_COLUMN.into(), average.to_vec()));

        info!(
            "Predicted {} rows with {} model(s) in {:.2}s",
            x.nrows(),
            predictions.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(DataFrame::new(columns)?)
    }

    /// Kinds currently loaded, in fixed order
    pub fn loaded_kinds(&self) -> Vec<ModelKind> {
        self.models.keys().copied().collect()
    }

    pub fn is_loaded(&self) -> bool {
        !self.models.is_empty()
    }
}

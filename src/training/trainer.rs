//! Cross-validated training and persistence of every configured model kind

use super::cross_validation::{CVResults, CVSplit, KFold};
use super::factory::ModelFactory;
use super::models::{rmse, BoostedModel, ModelKind, Regressor};
use crate::config::Config;
use crate::error::{LtvError, Result};
use crate::export::{model_artifact_path, save_artifact};
use crate::preprocessing::to_matrix;
use ndarray::{Array1, Array2, Axis};
use polars::prelude::DataFrame;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// File name of the per-kind CV summary inside the output directory
pub const CV_RESULTS_FILE: &str = "cv_results.json";

/// Runs k-fold CV for each model kind, then refits on all rows and saves
/// `<output_dir>/<kind>_model.joblib`.
pub struct Trainer {
    config: Config,
    cv_results: BTreeMap<ModelKind, CVResults>,
}

impl Trainer {
    pub fn new(config: &Config) -> Self {
        Self { config: config.clone(), cv_results: BTreeMap::new() }
    }

    /// Model kinds to train, in fixed order
    pub fn model_kinds(&self) -> Result<Vec<ModelKind>> {
        self.config.training.model_kinds()
    }

    /// Train every kind; returns the mean CV RMSE per kind
    pub fn train(&mut self, features: &DataFrame, target: &Array1<f64>) -> Result<BTreeMap<ModelKind, f64>> {
        let start = Instant::now();
        let x = to_matrix(features)?;
        if x.nrows() != target.len() {
            return Err(LtvError::Shape {
                expected: format!("{} target values", x.nrows()),
                actual: format!("{} target values", target.len()),
            });
        }

        // Every kind is built up front so a bad mapping fails before any fitting
        let seed = self.config.training.random_seed;
        let prototypes = self
            .model_kinds()?
            .into_iter()
            .map(|kind| {
                let params = self.config.model_params(kind.as_str()).ok_or_else(|| {
                    LtvError::Config(format!("no hyperparameters configured for model '{}'", kind))
                })?;
                ModelFactory::get_model(kind, params, seed)
            })
            .collect::<Result<Vec<_>>>()?;

        let folds = KFold::new(self.config.training.cv_folds)
            .shuffled(seed)
            .split(x.nrows())?;

        let output_dir = self.config.training.output_dir.clone();
        fs::create_dir_all(&output_dir)?;

        let mut scores = BTreeMap::new();
        for prototype in prototypes {
            let kind = prototype.kind();
            info!("Training {}...", kind);
            let model_start = Instant::now();

            let results = cross_validate(&prototype, &x, target, &folds)?;
            info!(
                "{} CV RMSE: {:.4} (+/- {:.4})",
                kind, results.mean_score, results.std_score
            );

            let mut model = prototype;
            model.fit(&x, target)?;
            let path = model_artifact_path(&output_dir, kind);
            save_artifact(&model, &path)?;
            info!(
                "Saved {} model to {} in {:.2}s",
                kind,
                path.display(),
                model_start.elapsed().as_secs_f64()
            );

            scores.insert(kind, results.mean_score);
            self.cv_results.insert(kind, results);
        }

        let summary = write_cv_results(&output_dir, &self.cv_results)?;
        info!(
            "Trained {} model(s) in {:.2}s; CV summary at {}",
            scores.len(),
            start.elapsed().as_secs_f64(),
            summary.display()
        );
        Ok(scores)
    }

    /// Fold-level results of the last `train` call
    pub fn cv_results(&self) -> &BTreeMap<ModelKind, CVResults> {
        &self.cv_results
    }
}

/// Fit a fresh copy of `prototype` per fold and score held-out rows by RMSE
fn cross_validate(
    prototype: &BoostedModel,
    x: &Array2<f64>,
    y: &Array1<f64>,
    folds: &[CVSplit],
) -> Result<CVResults> {
    let mut fold_scores = Vec::with_capacity(folds.len());
    for split in folds {
        let mut model = prototype.clone();
        model.fit(&x.select(Axis(0), &split.train_indices), &y.select(Axis(0), &split.train_indices))?;

        let y_true = y.select(Axis(0), &split.test_indices);
        let y_pred = model.predict(&x.select(Axis(0), &split.test_indices))?;
        let score = rmse(&y_true, &y_pred);
        debug!("{} fold {}: RMSE {:.4}", prototype.kind(), split.fold_idx + 1, score);
        fold_scores.push(score);
    }
    Ok(CVResults::from_scores(fold_scores))
}

fn write_cv_results(output_dir: &Path, results: &BTreeMap<ModelKind, CVResults>) -> Result<PathBuf> {
    let path = output_dir.join(CV_RESULTS_FILE);
    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(writer, results)?;
    Ok(path)
}

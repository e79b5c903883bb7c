//! Integration test: Regressors, factory, cross-validation and the trainer

use ltv360::config::Config;
use ltv360::error::LtvError;
use ltv360::export::{load_artifact, model_artifact_path};
use ltv360::training::{
    BoostedModel, CVResults, KFold, ModelFactory, ModelKind, RegressionMetrics, Regressor, Trainer,
    CV_RESULTS_FILE,
};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde_yaml::Mapping;
use std::collections::BTreeMap;
use std::path::Path;

fn regression_data(n: usize) -> (Array2<f64>, Array1<f64>) {
    let x = Array2::from_shape_fn((n, 3), |(r, c)| match c {
        0 => r as f64,
        1 => ((r * 7) % 11) as f64,
        _ => (r as f64 * 0.3).sin(),
    });
    let y = x
        .rows()
        .into_iter()
        .map(|row| 4.0 * row[0] + 2.0 * row[1] + 10.0 * row[2] + 50.0)
        .collect();
    (x, y)
}

fn small_params(kind: ModelKind) -> Mapping {
    let yaml = match kind {
        ModelKind::XGBoost => "{ n_estimators: 40, max_depth: 3, learning_rate: 0.3 }",
        ModelKind::LightGbm => "{ n_estimators: 40, num_leaves: 8, min_child_samples: 3, learning_rate: 0.3 }",
        ModelKind::CatBoost => "{ iterations: 40, depth: 3, learning_rate: 0.3 }",
    };
    serde_yaml::from_str(yaml).unwrap()
}

fn training_config(output_dir: &Path) -> Config {
    let yaml = format!(
        r#"
data:
  raw_path: unused.csv
features:
  target_col: y
models:
  xgboost: {{ n_estimators: 10, max_depth: 3 }}
  lightgbm: {{ n_estimators: 10, num_leaves: 6, min_child_samples: 3 }}
  catboost: {{ iterations: 10, depth: 3 }}
training:
  output_dir: {}
  cv_folds: 4
  random_seed: 42
"#,
        output_dir.display()
    );
    Config::from_yaml_str(&yaml).unwrap()
}

fn feature_table(x: &Array2<f64>) -> DataFrame {
    let columns = (0..x.ncols())
        .map(|c| Column::new(format!("f{}", c).into(), x.column(c).to_vec()))
        .collect();
    DataFrame::new(columns).unwrap()
}

#[test]
fn test_every_kind_fits_and_predicts() {
    let (x, y) = regression_data(80);
    for kind in ModelKind::ALL {
        let mut model = ModelFactory::get_model(kind, &small_params(kind), 42).unwrap();
        assert_eq!(model.kind(), kind);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.n_features(), Some(3));

        let preds = model.predict(&x).unwrap();
        let r2 = RegressionMetrics::compute(&y, &preds).r2;
        assert!(r2 > 0.8, "{} training R² = {}", kind, r2);
    }
}

#[test]
fn test_refit_discards_previous_fit() {
    let (x, y) = regression_data(40);
    let mut model = ModelFactory::get_model(ModelKind::XGBoost, &small_params(ModelKind::XGBoost), 42).unwrap();
    model.fit(&x, &y).unwrap();

    let narrow = x.slice(ndarray::s![.., ..2]).to_owned();
    model.fit(&narrow, &y).unwrap();
    assert_eq!(model.n_features(), Some(2));
    assert!(matches!(model.predict(&x), Err(LtvError::Shape { .. })));
}

#[test]
fn test_same_seed_same_model() {
    let (x, y) = regression_data(60);
    let params: Mapping = serde_yaml::from_str("{ n_estimators: 10, subsample: 0.6, bagging_freq: 1, colsample_bytree: 0.7 }").unwrap();

    let mut a = ModelFactory::get_model(ModelKind::LightGbm, &params, 9).unwrap();
    let mut b = ModelFactory::get_model(ModelKind::LightGbm, &params, 9).unwrap();
    a.fit(&x, &y).unwrap();
    b.fit(&x, &y).unwrap();
    assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
}

#[test]
fn test_kfold_partitions_rows() {
    let splits = KFold::new(5).shuffled(42).split(23).unwrap();
    let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.iter().copied()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..23).collect::<Vec<_>>());
    assert_eq!(splits[0].test_indices.len(), 5);
    assert_eq!(splits[4].test_indices.len(), 4);
}

#[test]
fn test_trainer_scores_and_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("models");
    let (x, y) = regression_data(48);

    let mut trainer = Trainer::new(&training_config(&out));
    let scores = trainer.train(&feature_table(&x), &y).unwrap();

    assert_eq!(scores.keys().copied().collect::<Vec<_>>(), ModelKind::ALL.to_vec());
    for (kind, score) in &scores {
        assert!(score.is_finite() && *score > 0.0, "{} CV RMSE = {}", kind, score);

        let model: BoostedModel = load_artifact(&model_artifact_path(&out, *kind)).unwrap();
        assert_eq!(model.kind(), *kind);
        assert_eq!(model.n_features(), Some(3));
    }

    let json = std::fs::read_to_string(out.join(CV_RESULTS_FILE)).unwrap();
    let summary: BTreeMap<ModelKind, CVResults> = serde_json::from_str(&json).unwrap();
    assert_eq!(summary.len(), 3);
    assert!(summary.values().all(|r| r.n_folds == 4 && r.scores.len() == 4));
    assert!((summary[&ModelKind::CatBoost].mean_score - scores[&ModelKind::CatBoost]).abs() < 1e-12);
}

#[test]
fn test_saved_model_is_full_data_refit() {
    let dir = tempfile::tempdir().unwrap();
    let config = training_config(dir.path());
    let (x, y) = regression_data(40);

    Trainer::new(&config).train(&feature_table(&x), &y).unwrap();

    for kind in ModelKind::ALL {
        let saved: BoostedModel = load_artifact(&model_artifact_path(dir.path(), kind)).unwrap();

        let params = config.model_params(kind.as_str()).unwrap();
        let mut full = ModelFactory::get_model(kind, params, config.training.random_seed).unwrap();
        full.fit(&x, &y).unwrap();

        assert_eq!(
            saved.predict(&x).unwrap(),
            full.predict(&x).unwrap(),
            "{} artifact is not the model fitted on every row",
            kind
        );
    }
}

#[test]
fn test_trainer_is_deterministic() {
    let (x, y) = regression_data(40);
    let features = feature_table(&x);

    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let a = Trainer::new(&training_config(dir_a.path())).train(&features, &y).unwrap();
    let b = Trainer::new(&training_config(dir_b.path())).train(&features, &y).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_trainer_subset_of_models() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = training_config(dir.path());
    config.training.models = Some(vec!["lightgbm".into()]);
    let (x, y) = regression_data(30);

    let scores = Trainer::new(&config).train(&feature_table(&x), &y).unwrap();
    assert_eq!(scores.keys().copied().collect::<Vec<_>>(), vec![ModelKind::LightGbm]);
    assert!(!model_artifact_path(dir.path(), ModelKind::XGBoost).exists());
}

#[test]
fn test_unknown_model_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = training_config(dir.path());
    config.training.models = Some(vec!["xgboost".into(), "prophet".into()]);
    let (x, y) = regression_data(30);

    let err = Trainer::new(&config).train(&feature_table(&x), &y).unwrap_err();
    assert!(err.is_config_error());
    assert!(!model_artifact_path(dir.path(), ModelKind::XGBoost).exists());
}

#[test]
fn test_single_fold_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = training_config(dir.path());
    config.training.cv_folds = 1;
    let (x, y) = regression_data(30);

    let err = Trainer::new(&config).train(&feature_table(&x), &y).unwrap_err();
    assert!(matches!(err, LtvError::Validation(_)));
}

//! Integration test: Ensemble prediction over saved artifacts

use ltv360::config::Config;
use ltv360::error::LtvError;
use ltv360::export::model_artifact_path;
use ltv360::inference::{Predictor, AVERAGE_COLUMN};
use ltv360::training::{ModelKind, Trainer};
use ndarray::Array1;
use polars::prelude::*;
use std::path::Path;

fn config(output_dir: &Path, min_models: usize) -> Config {
    let yaml = format!(
        r#"
data:
  raw_path: unused.csv
features:
  target_col: y
models:
  xgboost: {{ n_estimators: 8, max_depth: 3 }}
  lightgbm: {{ n_estimators: 8, num_leaves: 6, min_child_samples: 2 }}
  catboost: {{ iterations: 8, depth: 3 }}
training:
  output_dir: {}
  cv_folds: 3
prediction:
  min_models: {}
"#,
        output_dir.display(),
        min_models
    );
    Config::from_yaml_str(&yaml).unwrap()
}

fn features(n: usize) -> DataFrame {
    let a: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let b: Vec<f64> = (0..n).map(|i| ((i * 5) % 7) as f64).collect();
    df!("a" => a, "b" => b).unwrap()
}

fn train_all(output_dir: &Path) {
    let n = 36;
    let y: Array1<f64> = (0..n).map(|i| 10.0 * i as f64 + ((i * 5) % 7) as f64).collect();
    Trainer::new(&config(output_dir, 1)).train(&features(n), &y).unwrap();
}

fn values(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().into_iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_average_of_all_models() {
    let dir = tempfile::tempdir().unwrap();
    train_all(dir.path());

    let mut predictor = Predictor::new(&config(dir.path(), 1)).unwrap();
    let out = predictor.predict(&features(5)).unwrap();

    assert_eq!(
        column_names(&out),
        vec!["pred_xgboost", "pred_lightgbm", "pred_catboost", AVERAGE_COLUMN]
    );
    assert_eq!(out.height(), 5);

    let avg = values(&out, AVERAGE_COLUMN);
    for row in 0..5 {
        let mean = ModelKind::ALL
            .iter()
            .map(|k| values(&out, &k.prediction_column())[row])
            .sum::<f64>()
            / 3.0;
        assert!((avg[row] - mean).abs() < 1e-9);
    }
}

#[test]
fn test_missing_artifact_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    train_all(dir.path());
    std::fs::remove_file(model_artifact_path(dir.path(), ModelKind::LightGbm)).unwrap();

    let mut predictor = Predictor::new(&config(dir.path(), 1)).unwrap();
    let out = predictor.predict(&features(4)).unwrap();

    assert_eq!(predictor.loaded_kinds(), vec![ModelKind::XGBoost, ModelKind::CatBoost]);
    assert_eq!(column_names(&out), vec!["pred_xgboost", "pred_catboost", AVERAGE_COLUMN]);

    let xgb = values(&out, "pred_xgboost");
    let cat = values(&out, "pred_catboost");
    let avg = values(&out, AVERAGE_COLUMN);
    for row in 0..4 {
        assert!((avg[row] - (xgb[row] + cat[row]) / 2.0).abs() < 1e-9);
    }
}

#[test]
fn test_too_few_models_fails() {
    let dir = tempfile::tempdir().unwrap();
    train_all(dir.path());
    std::fs::remove_file(model_artifact_path(dir.path(), ModelKind::XGBoost)).unwrap();
    std::fs::remove_file(model_artifact_path(dir.path(), ModelKind::CatBoost)).unwrap();

    let mut predictor = Predictor::new(&config(dir.path(), 2)).unwrap();
    let err = predictor.predict(&features(3)).unwrap_err();
    assert!(matches!(err, LtvError::InsufficientModels { loaded: 1, required: 2 }));
}

#[test]
fn test_empty_output_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut predictor = Predictor::new(&config(dir.path(), 1)).unwrap();
    let err = predictor.predict(&features(3)).unwrap_err();
    assert!(matches!(err, LtvError::NoModelsAvailable(_)));
}

#[test]
fn test_models_loaded_once() {
    let dir = tempfile::tempdir().unwrap();
    train_all(dir.path());

    let mut predictor = Predictor::new(&config(dir.path(), 1)).unwrap();
    assert_eq!(predictor.load_models().unwrap(), 3);
    let first = predictor.predict(&features(3)).unwrap();

    // Later predictions use the in-memory models
    for kind in ModelKind::ALL {
        std::fs::remove_file(model_artifact_path(dir.path(), kind)).unwrap();
    }
    let second = predictor.predict(&features(3)).unwrap();
    assert_eq!(values(&first, AVERAGE_COLUMN), values(&second, AVERAGE_COLUMN));
}

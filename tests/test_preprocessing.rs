//! Integration test: Feature generation fit/transform and persistence

use ltv360::config::FeaturesConfig;
use ltv360::error::LtvError;
use ltv360::export::preprocessor_artifact_path;
use ltv360::preprocessing::{extract_target, to_matrix, FeatureGenerator};
use polars::prelude::*;

fn features_config() -> FeaturesConfig {
    FeaturesConfig {
        target_col: "ltv".into(),
        categorical_cols: vec!["country".into(), "channel".into()],
        numerical_cols: vec!["frequency".into(), "monetary".into(), "not_in_data".into()],
        id_col: "customer_id".into(),
        date_col: "transaction_date".into(),
    }
}

fn training_df() -> DataFrame {
    df!(
        "customer_id" => &[101i64, 102, 103, 104, 105, 106],
        "transaction_date" => &["2024-01-03", "2024-01-09", "2024-02-11", "2024-02-15", "2024-03-01", "2024-03-20"],
        "country" => &["US", "DE", "US", "FR", "DE", "US"],
        "channel" => &["web", "app", "app", "web", "store", "web"],
        "frequency" => &[3i64, 7, 1, 4, 9, 2],
        "monetary" => &[120.0, 640.5, 35.0, 210.0, 990.0, 80.0],
        "ltv" => &[300.0, 1500.0, 60.0, 450.0, 2100.0, 150.0]
    )
    .unwrap()
}

fn scoring_df() -> DataFrame {
    df!(
        "customer_id" => &[201i64, 202],
        "transaction_date" => &["2024-04-01", "2024-04-02"],
        "country" => &["US", "JP"],
        "channel" => &["kiosk", "app"],
        "frequency" => &[5i64, 0],
        "monetary" => &[300.0, 0.0]
    )
    .unwrap()
}

fn column_values(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

#[test]
fn test_feature_columns_numeric_then_one_hot() {
    let mut generator = FeatureGenerator::new(features_config());
    let features = generator.fit_transform(&training_df()).unwrap();

    let expected = vec![
        "frequency",
        "monetary",
        "country_DE",
        "country_FR",
        "country_US",
        "channel_app",
        "channel_store",
        "channel_web",
    ];
    assert_eq!(generator.feature_names(), expected.as_slice());
    let names: Vec<&str> = features.get_column_names().into_iter().map(|n| n.as_str()).collect();
    assert_eq!(names, expected);
    assert_eq!(features.height(), 6);

    for reserved in ["customer_id", "transaction_date", "ltv"] {
        assert!(features.column(reserved).is_err(), "{} leaked into features", reserved);
    }
}

#[test]
fn test_scaled_columns_standardized() {
    let mut generator = FeatureGenerator::new(features_config());
    let features = generator.fit_transform(&training_df()).unwrap();

    let monetary = column_values(&features, "monetary");
    let mean = monetary.iter().sum::<f64>() / monetary.len() as f64;
    let var = monetary.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / monetary.len() as f64;
    assert!(mean.abs() < 1e-9);
    assert!((var - 1.0).abs() < 1e-9);
}

#[test]
fn test_transform_reuses_fitted_columns() {
    let mut generator = FeatureGenerator::new(features_config());
    let fitted = generator.fit_transform(&training_df()).unwrap();

    let features = generator.transform(&scoring_df()).unwrap();
    assert_eq!(features.get_column_names(), fitted.get_column_names());
    assert_eq!(features.height(), 2);

    // "JP" and "kiosk" were never seen during fit
    assert_eq!(column_values(&features, "country_US"), vec![1.0, 0.0]);
    assert_eq!(column_values(&features, "country_DE"), vec![0.0, 0.0]);
    assert_eq!(column_values(&features, "channel_web"), vec![0.0, 0.0]);
    assert_eq!(column_values(&features, "channel_app"), vec![0.0, 1.0]);
}

#[test]
fn test_disjoint_sample_keeps_column_order() {
    let mut generator = FeatureGenerator::new(features_config());
    let fitted = generator.fit_transform(&training_df()).unwrap();

    // New customers, only categories seen during fit, columns shuffled
    let sample = df!(
        "monetary" => &[55.0, 410.0, 75.5],
        "channel" => &["store", "web", "app"],
        "frequency" => &[2i64, 6, 3],
        "country" => &["FR", "US", "DE"],
        "customer_id" => &[301i64, 302, 303]
    )
    .unwrap();
    let features = generator.transform(&sample).unwrap();

    assert_eq!(features.get_column_names(), fitted.get_column_names());
    assert_eq!(features.height(), 3);

    let x = to_matrix(&features).unwrap();
    for row in x.rows() {
        // one country and one channel indicator per row
        assert_eq!(row.iter().skip(2).sum::<f64>(), 2.0);
    }
    assert_eq!(column_values(&features, "country_FR"), vec![1.0, 0.0, 0.0]);
    assert_eq!(column_values(&features, "channel_store"), vec![1.0, 0.0, 0.0]);
}

#[test]
fn test_save_and_load_reproduce_transform() {
    let dir = tempfile::tempdir().unwrap();
    let path = preprocessor_artifact_path(dir.path());

    let mut generator = FeatureGenerator::new(features_config());
    generator.fit_transform(&training_df()).unwrap();
    generator.save(&path).unwrap();

    let restored = FeatureGenerator::load(&path).unwrap();
    assert_eq!(restored.feature_names(), generator.feature_names());

    let original = to_matrix(&generator.transform(&scoring_df()).unwrap()).unwrap();
    let reloaded = to_matrix(&restored.transform(&scoring_df()).unwrap()).unwrap();
    assert_eq!(original, reloaded);
}

#[test]
fn test_load_without_artifact_is_not_fitted() {
    let dir = tempfile::tempdir().unwrap();
    let err = FeatureGenerator::load(&preprocessor_artifact_path(dir.path())).unwrap_err();
    assert!(matches!(err, LtvError::NotFitted(_)));
}

#[test]
fn test_missing_feature_column_at_transform() {
    let mut generator = FeatureGenerator::new(features_config());
    generator.fit_transform(&training_df()).unwrap();

    let scoring = scoring_df().drop("monetary").unwrap();
    let err = generator.transform(&scoring).unwrap_err();
    assert!(matches!(err, LtvError::FeatureNotFound(name) if name == "monetary"));
}

#[test]
fn test_extract_target() {
    let y = extract_target(&training_df(), "ltv").unwrap();
    assert_eq!(y.len(), 6);
    assert_eq!(y[4], 2100.0);
}

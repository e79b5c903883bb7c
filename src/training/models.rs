//! Model kinds, the regressor trait and evaluation metrics

use super::catboost::CatBoostRegressor;
use super::lightgbm::LightGBMRegressor;
use super::xgboost::XGBoostRegressor;
use crate::error::{LtvError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of ensemble members
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[serde(rename = "xgboost")]
    XGBoost,
    #[serde(rename = "lightgbm")]
    LightGbm,
    #[serde(rename = "catboost")]
    CatBoost,
}

impl ModelKind {
    /// All kinds, in training and reporting order
    pub const ALL: [ModelKind; 3] = [ModelKind::XGBoost, ModelKind::LightGbm, ModelKind::CatBoost];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::XGBoost => "xgboost",
            ModelKind::LightGbm => "lightgbm",
            ModelKind::CatBoost => "catboost",
        }
    }

    /// Name of this kind's column in a prediction table
    pub fn prediction_column(&self) -> String {
        format!("pred_{}", self.as_str())
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = LtvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "xgboost" => Ok(ModelKind::XGBoost),
            "lightgbm" => Ok(ModelKind::LightGbm),
            "catboost" => Ok(ModelKind::CatBoost),
            other => Err(LtvError::UnknownModel(other.to_string())),
        }
    }
}

/// Trait for regressors that take part in the ensemble
pub trait Regressor: Send + Sync {
    /// Fit the model to training data, discarding any previous fit
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one value per row
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Input width seen during fit, `None` before fitting
    fn n_features(&self) -> Option<usize>;
}

/// A regressor of one of the fixed kinds; the unit persisted per kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BoostedModel {
    XGBoost(XGBoostRegressor),
    LightGbm(LightGBMRegressor),
    CatBoost(CatBoostRegressor),
}

impl BoostedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            BoostedModel::XGBoost(_) => ModelKind::XGBoost,
            BoostedModel::LightGbm(_) => ModelKind::LightGbm,
            BoostedModel::CatBoost(_) => ModelKind::CatBoost,
        }
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            BoostedModel::XGBoost(m) => m,
            BoostedModel::LightGbm(m) => m,
            BoostedModel::CatBoost(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Regressor {
        match self {
            BoostedModel::XGBoost(m) => m,
            BoostedModel::LightGbm(m) => m,
            BoostedModel::CatBoost(m) => m,
        }
    }
}

impl Regressor for BoostedModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }

    fn n_features(&self) -> Option<usize> {
        self.inner().n_features()
    }
}

/// Shared input checks for regressor implementations
pub(crate) fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(LtvError::Training("Empty dataset".into()));
    }
    if x.nrows() != y.len() {
        return Err(LtvError::Shape {
            expected: format!("{} target values", x.nrows()),
            actual: format!("{} target values", y.len()),
        });
    }
    Ok(())
}

pub(crate) fn check_predict_input(
    model: &'static str,
    n_features: Option<usize>,
    x: &Array2<f64>,
) -> Result<()> {
    let expected = n_features.ok_or(LtvError::NotFitted(model))?;
    if x.ncols() != expected {
        return Err(LtvError::Shape {
            expected: format!("{} feature columns", expected),
            actual: format!("{} feature columns", x.ncols()),
        });
    }
    Ok(())
}

/// Metrics for regression evaluation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len().max(1) as f64;
        let errors: Vec<f64> = y_true.iter().zip(y_pred.iter()).map(|(t, p)| t - p).collect();

        let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let y_mean = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e.powi(2)).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        Self { mse, rmse: mse.sqrt(), mae, r2 }
    }
}

/// Root mean squared error
pub fn rmse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    RegressionMetrics::compute(y_true, y_pred).rmse
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_model_kind_round_trip_names() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.as_str().parse::<ModelKind>().unwrap(), kind);
        }
        assert_eq!(ModelKind::CatBoost.prediction_column(), "pred_catboost");
        assert_eq!(" LightGBM ".parse::<ModelKind>().unwrap(), ModelKind::LightGbm);
    }

    #[test]
    fn test_unknown_model_kind() {
        let err = "random_forest".parse::<ModelKind>().unwrap_err();
        assert!(matches!(err, LtvError::UnknownModel(name) if name == "random_forest"));
    }

    #[test]
    fn test_model_kind_json_key() {
        let json = serde_json::to_string(&ModelKind::LightGbm).unwrap();
        assert_eq!(json, "\"lightgbm\"");
    }

    #[test]
    fn test_regression_metrics() {
        let y_true = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y_pred = array![1.1, 2.0, 2.9, 4.1, 5.0];

        let metrics = RegressionMetrics::compute(&y_true, &y_pred);
        assert!((metrics.rmse - (0.03f64 / 5.0).sqrt()).abs() < 1e-12);
        assert!(metrics.r2 > 0.9);
    }

    #[test]
    fn test_rmse_perfect_fit() {
        let y = array![3.0, -1.0, 7.5];
        assert_eq!(rmse(&y, &y), 0.0);
    }
}

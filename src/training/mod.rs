//! Model training module
//!
//! Provides the three gradient-boosted regressors of the ensemble
//! (XGBoost-, LightGBM- and CatBoost-style), a factory that builds them from
//! configured hyperparameters, k-fold cross-validation, and the trainer that
//! evaluates, refits and persists each of them.

mod factory;
mod models;
mod trainer;
pub mod catboost;
pub mod cross_validation;
pub mod lightgbm;
pub mod xgboost;

pub use catboost::{CatBoostConfig, CatBoostRegressor};
pub use cross_validation::{CVResults, CVSplit, KFold};
pub use factory::ModelFactory;
pub use lightgbm::{BoostingType, LightGBMConfig, LightGBMRegressor};
pub use models::{rmse, BoostedModel, ModelKind, RegressionMetrics, Regressor};
pub use trainer::{Trainer, CV_RESULTS_FILE};
pub use xgboost::{XGBoostConfig, XGBoostRegressor};

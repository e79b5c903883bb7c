//! Builds regressors from configured hyperparameter mappings

use super::catboost::{CatBoostConfig, CatBoostRegressor};
use super::lightgbm::{LightGBMConfig, LightGBMRegressor};
use super::models::{BoostedModel, ModelKind};
use super::xgboost::{XGBoostConfig, XGBoostRegressor};
use crate::error::{LtvError, Result};
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

/// Creates unfitted regressors for a model kind
pub struct ModelFactory;

impl ModelFactory {
    /// Build an unfitted regressor of `kind` from `params`.
    ///
    /// Unsupported keys are dropped with a warning. `seed` is used when the
    /// mapping sets no seed of its own. Malformed or out-of-range values are
    /// configuration errors.
    pub fn get_model(kind: ModelKind, params: &Mapping, seed: u64) -> Result<BoostedModel> {
        let model = match kind {
            ModelKind::XGBoost => {
                let mut config: XGBoostConfig = parse_params(kind, params, XGBoostConfig::KEYS)?;
                config.random_state.get_or_insert(seed);
                config.validate()?;
                BoostedModel::XGBoost(XGBoostRegressor::new(config))
            }
            ModelKind::LightGbm => {
                let mut config: LightGBMConfig = parse_params(kind, params, LightGBMConfig::KEYS)?;
                config.random_state.get_or_insert(seed);
                config.validate()?;
                BoostedModel::LightGbm(LightGBMRegressor::new(config))
            }
            ModelKind::CatBoost => {
                let mut config: CatBoostConfig = parse_params(kind, params, CatBoostConfig::KEYS)?;
                config.random_state.get_or_insert(seed);
                config.validate()?;
                BoostedModel::CatBoost(CatBoostRegressor::new(config))
            }
        };

        debug!("Built {} regressor from {} hyperparameter(s)", kind, params.len());
        Ok(model)
    }
}

fn parse_params<T: DeserializeOwned>(kind: ModelKind, params: &Mapping, known: &[&str]) -> Result<T> {
    let mut supported = Mapping::new();
    for (key, value) in params {
        match key.as_str() {
            Some(name) if known.contains(&name) => {
                supported.insert(key.clone(), value.clone());
            }
            Some(name) => warn!("Ignoring unsupported {} hyperparameter '{}'", kind, name),
            None => warn!("Ignoring non-string {} hyperparameter key {:?}", kind, key),
        }
    }

    serde_yaml::from_value(Value::Mapping(supported))
        .map_err(|e| LtvError::Config(format!("invalid {} hyperparameters: {}", kind, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::models::Regressor;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_native_aliases() {
        let model = ModelFactory::get_model(
            ModelKind::XGBoost,
            &mapping("{ eta: 0.05, lambda: 2.0, n_estimators: 10 }"),
            42,
        )
        .unwrap();
        let BoostedModel::XGBoost(m) = model else { panic!("wrong kind") };
        assert_eq!(m.config().learning_rate, 0.05);
        assert_eq!(m.config().reg_lambda, 2.0);
        assert_eq!(m.config().random_state, Some(42));

        let model = ModelFactory::get_model(
            ModelKind::CatBoost,
            &mapping("{ iterations: 20, depth: 4, l2_leaf_reg: 1, random_seed: 3 }"),
            42,
        )
        .unwrap();
        let BoostedModel::CatBoost(m) = model else { panic!("wrong kind") };
        assert_eq!(m.config().iterations, 20);
        assert_eq!(m.config().depth, 4);
        assert_eq!(m.config().l2_leaf_reg, 1.0);
        assert_eq!(m.config().random_state, Some(3));
    }

    #[test]
    fn test_lightgbm_params() {
        let model = ModelFactory::get_model(
            ModelKind::LightGbm,
            &mapping("{ num_leaves: 15, max_depth: -1, boosting_type: goss, min_data_in_leaf: 5 }"),
            1,
        )
        .unwrap();
        assert_eq!(model.kind(), ModelKind::LightGbm);
        assert!(model.n_features().is_none());
        let BoostedModel::LightGbm(m) = model else { panic!("wrong kind") };
        assert_eq!(m.config().num_leaves, 15);
        assert_eq!(m.config().min_child_samples, 5);
    }

    #[test]
    fn test_unsupported_keys_ignored() {
        let model = ModelFactory::get_model(
            ModelKind::XGBoost,
            &mapping("{ n_jobs: -1, verbosity: 0, max_depth: 3 }"),
            42,
        );
        assert!(model.is_ok());
    }

    #[test]
    fn test_malformed_value_is_config_error() {
        let err = ModelFactory::get_model(
            ModelKind::XGBoost,
            &mapping("{ max_depth: deep }"),
            42,
        )
        .unwrap_err();
        assert!(err.is_config_error());

        let err = ModelFactory::get_model(
            ModelKind::CatBoost,
            &mapping("{ learning_rate: -0.1 }"),
            42,
        )
        .unwrap_err();
        assert!(matches!(err, LtvError::Config(_)));
    }
}

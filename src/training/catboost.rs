//! CatBoost-style gradient boosting with symmetric (oblivious) trees
//!
//! Every level of a tree applies one (feature, threshold) test to all of its
//! nodes, so a tree of depth `d` is `d` tests plus `2^d` leaf values and a
//! prediction is a bit-index lookup.

use super::models::{check_fit_input, check_predict_input, Regressor};
use crate::error::{LtvError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum number of threshold candidates tried per feature and level
const MAX_THRESHOLD_CANDIDATES: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatBoostConfig {
    #[serde(alias = "n_estimators", alias = "num_boost_round", alias = "num_trees")]
    pub iterations: usize,
    #[serde(alias = "eta")]
    pub learning_rate: f64,
    #[serde(alias = "max_depth")]
    pub depth: usize,
    #[serde(alias = "reg_lambda")]
    pub l2_leaf_reg: f64,
    pub subsample: f64,
    /// Fraction of features considered at each level
    #[serde(alias = "colsample_bylevel")]
    pub rsm: f64,
    #[serde(alias = "random_seed", alias = "seed")]
    pub random_state: Option<u64>,
}

impl CatBoostConfig {
    /// Keys accepted in a hyperparameter mapping, aliases included
    pub const KEYS: &'static [&'static str] = &[
        "iterations",
        "n_estimators",
        "num_boost_round",
        "num_trees",
        "learning_rate",
        "eta",
        "depth",
        "max_depth",
        "l2_leaf_reg",
        "reg_lambda",
        "subsample",
        "rsm",
        "colsample_bylevel",
        "random_state",
        "random_seed",
        "seed",
    ];

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(LtvError::Config("catboost: iterations must be positive".into()));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(LtvError::Config("catboost: learning_rate must be positive".into()));
        }
        if self.depth > 16 {
            return Err(LtvError::Config("catboost: depth must be at most 16".into()));
        }
        if self.l2_leaf_reg < 0.0 {
            return Err(LtvError::Config("catboost: l2_leaf_reg must be non-negative".into()));
        }
        for (name, ratio) in [("subsample", self.subsample), ("rsm", self.rsm)] {
            if ratio.is_nan() || ratio <= 0.0 || ratio > 1.0 {
                return Err(LtvError::Config(format!("catboost: {} must be in (0, 1]", name)));
            }
        }
        Ok(())
    }
}

impl Default for CatBoostConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            learning_rate: 0.1,
            depth: 6,
            l2_leaf_reg: 3.0,
            subsample: 1.0,
            rsm: 1.0,
            random_state: None,
        }
    }
}

/// Symmetric (oblivious) tree: each level uses the same split feature + threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SymmetricTree {
    splits: Vec<(usize, f64)>, // (feature, threshold) per level
    leaf_values: Vec<f64>,     // 2^depth leaf values
}

impl SymmetricTree {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        let idx = self
            .splits
            .iter()
            .fold(0usize, |idx, &(feature, threshold)| idx * 2 + usize::from(sample[feature] > threshold));
        self.leaf_values.get(idx).copied().unwrap_or(0.0)
    }
}

fn score(g: f64, h: f64, reg_lambda: f64) -> f64 {
    let denom = h + reg_lambda;
    if denom <= 0.0 {
        0.0
    } else {
        g * g / denom
    }
}

/// Best threshold for one feature, summing gain over every current bucket
fn best_level_split(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    buckets: &[Vec<usize>],
    feature: usize,
    reg_lambda: f64,
) -> Option<(usize, f64, f64)> {
    let mut values: Vec<f64> = buckets.iter().flat_map(|b| b.iter().map(|&i| x[[i, feature]])).collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values.dedup();
    if values.len() < 2 {
        return None;
    }

    let step = (values.len() / MAX_THRESHOLD_CANDIDATES).max(1);
    let mut best: Option<(f64, f64)> = None;

    for i in (0..values.len() - 1).step_by(step) {
        let threshold = (values[i] + values[i + 1]) / 2.0;
        let mut total_gain = 0.0;

        for bucket in buckets {
            let (lg, lh, rg, rh) = bucket.iter().fold((0.0, 0.0, 0.0, 0.0), |(lg, lh, rg, rh), &idx| {
                if x[[idx, feature]] <= threshold {
                    (lg + gradients[idx], lh + hessians[idx], rg, rh)
                } else {
                    (lg, lh, rg + gradients[idx], rh + hessians[idx])
                }
            });
            total_gain += score(lg, lh, reg_lambda) + score(rg, rh, reg_lambda)
                - score(lg + rg, lh + rh, reg_lambda);
        }

        if best.map_or(true, |(_, g)| total_gain > g) {
            best = Some((threshold, total_gain));
        }
    }

    best.filter(|(_, gain)| *gain > 0.0).map(|(thr, gain)| (feature, thr, gain))
}

fn build_symmetric_tree(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    config: &CatBoostConfig,
    rng: &mut Xoshiro256PlusPlus,
) -> SymmetricTree {
    let mut splits = Vec::with_capacity(config.depth);
    let mut buckets: Vec<Vec<usize>> = vec![indices.to_vec()];

    for _ in 0..config.depth {
        let features = super::xgboost::subsample(rng, x.ncols(), config.rsm);
        let best = features
            .par_iter()
            .filter_map(|&feat| best_level_split(x, gradients, hessians, &buckets, feat, config.l2_leaf_reg))
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

        let Some((feature, threshold, _)) = best else {
            break;
        };
        splits.push((feature, threshold));
        buckets = buckets
            .iter()
            .flat_map(|bucket| {
                let (left, right): (Vec<usize>, Vec<usize>) =
                    bucket.iter().partition(|&&i| x[[i, feature]] <= threshold);
                [left, right]
            })
            .collect();
    }

    let leaf_values = buckets
        .iter()
        .map(|bucket| {
            let g: f64 = bucket.iter().map(|&i| gradients[i]).sum();
            let h: f64 = bucket.iter().map(|&i| hessians[i]).sum();
            let denom = h + config.l2_leaf_reg;
            if bucket.is_empty() || denom <= 0.0 {
                0.0
            } else {
                -g / denom
            }
        })
        .collect();

    SymmetricTree { splits, leaf_values }
}

// ============ CatBoost Regressor ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatBoostRegressor {
    config: CatBoostConfig,
    trees: Vec<SymmetricTree>,
    base_prediction: f64,
    n_features: Option<usize>,
}

impl CatBoostRegressor {
    pub fn new(config: CatBoostConfig) -> Self {
        Self { config, trees: Vec::new(), base_prediction: 0.0, n_features: None }
    }

    pub fn config(&self) -> &CatBoostConfig {
        &self.config
    }
}

impl Regressor for CatBoostRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.config.validate()?;

        let n = x.nrows();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state.unwrap_or(42));
        self.base_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n, self.base_prediction);
        self.trees.clear();

        for _ in 0..self.config.iterations {
            let gradients: Vec<f64> = predictions.iter().zip(y.iter()).map(|(&p, &yi)| p - yi).collect();
            let hessians: Vec<f64> = vec![1.0; n];
            let rows = super::xgboost::subsample(&mut rng, n, self.config.subsample);

            let tree = build_symmetric_tree(x, &gradients, &hessians, &rows, &self.config, &mut rng);
            for (i, row) in x.rows().into_iter().enumerate() {
                predictions[i] += self.config.learning_rate * tree.predict(row);
            }
            self.trees.push(tree);
        }

        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_predict_input("CatBoostRegressor", self.n_features, x)?;
        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                self.base_prediction
                    + self
                        .trees
                        .iter()
                        .map(|t| self.config.learning_rate * t.predict(row))
                        .sum::<f64>()
            })
            .collect())
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }
}

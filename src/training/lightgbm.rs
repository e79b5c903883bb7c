//! LightGBM-style gradient boosting with leaf-wise tree growth
//!
//! Key differences from the XGBoost-style booster:
//! - Leaf-wise (best-first) tree growth bounded by a leaf budget instead of level-wise
//! - Optional Gradient-based One-Side Sampling (GOSS): keeps the largest gradients,
//!   samples the rest and re-weights them

use super::models::{check_fit_input, check_predict_input, Regressor};
use crate::error::{LtvError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Row sampling strategy per boosting round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoostingType {
    #[default]
    Gbdt,
    Goss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightGBMConfig {
    #[serde(alias = "num_iterations", alias = "num_boost_round")]
    pub n_estimators: usize,
    #[serde(alias = "eta")]
    pub learning_rate: f64,
    #[serde(alias = "max_leaves")]
    pub num_leaves: usize,
    /// Values <= 0 mean unlimited depth
    pub max_depth: i64,
    #[serde(alias = "min_data_in_leaf")]
    pub min_child_samples: usize,
    #[serde(alias = "lambda_l2")]
    pub reg_lambda: f64,
    #[serde(alias = "lambda_l1")]
    pub reg_alpha: f64,
    /// Fraction of rows bagged per draw; only used when `subsample_freq > 0`
    #[serde(alias = "bagging_fraction")]
    pub subsample: f64,
    /// Redraw the bag every this many rounds; 0 disables bagging
    #[serde(alias = "bagging_freq")]
    pub subsample_freq: usize,
    #[serde(alias = "feature_fraction")]
    pub colsample_bytree: f64,
    pub boosting_type: BoostingType,
    pub top_rate: f64,
    pub other_rate: f64,
    #[serde(alias = "seed", alias = "random_seed")]
    pub random_state: Option<u64>,
}

impl LightGBMConfig {
    /// Keys accepted in a hyperparameter mapping, aliases included
    pub const KEYS: &'static [&'static str] = &[
        "n_estimators",
        "num_iterations",
        "num_boost_round",
        "learning_rate",
        "eta",
        "num_leaves",
        "max_leaves",
        "max_depth",
        "min_child_samples",
        "min_data_in_leaf",
        "reg_lambda",
        "lambda_l2",
        "reg_alpha",
        "lambda_l1",
        "subsample",
        "bagging_fraction",
        "subsample_freq",
        "bagging_freq",
        "colsample_bytree",
        "feature_fraction",
        "boosting_type",
        "top_rate",
        "other_rate",
        "random_state",
        "seed",
        "random_seed",
    ];

    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(LtvError::Config("lightgbm: n_estimators must be positive".into()));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(LtvError::Config("lightgbm: learning_rate must be positive".into()));
        }
        if self.num_leaves < 2 {
            return Err(LtvError::Config("lightgbm: num_leaves must be at least 2".into()));
        }
        if self.reg_lambda < 0.0 || self.reg_alpha < 0.0 {
            return Err(LtvError::Config(
                "lightgbm: regularization terms must be non-negative".into(),
            ));
        }
        for (name, ratio) in [("subsample", self.subsample), ("colsample_bytree", self.colsample_bytree)] {
            if ratio.is_nan() || ratio <= 0.0 || ratio > 1.0 {
                return Err(LtvError::Config(format!("lightgbm: {} must be in (0, 1]", name)));
            }
        }
        if self.boosting_type == BoostingType::Goss
            && (self.top_rate <= 0.0 || self.other_rate < 0.0 || self.top_rate + self.other_rate > 1.0)
        {
            return Err(LtvError::Config(
                "lightgbm: goss needs top_rate > 0, other_rate >= 0 and top_rate + other_rate <= 1"
                    .into(),
            ));
        }
        Ok(())
    }

    fn bagging_enabled(&self) -> bool {
        self.subsample_freq > 0 && self.subsample < 1.0
    }

    fn depth_limit(&self) -> usize {
        if self.max_depth <= 0 {
            usize::MAX
        } else {
            self.max_depth as usize
        }
    }
}

impl Default for LightGBMConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            num_leaves: 31,
            max_depth: -1,
            min_child_samples: 20,
            reg_lambda: 0.0,
            reg_alpha: 0.0,
            subsample: 1.0,
            subsample_freq: 0,
            colsample_bytree: 1.0,
            boosting_type: BoostingType::Gbdt,
            top_rate: 0.2,
            other_rate: 0.1,
            random_state: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum LGBNode {
    Leaf { value: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<LGBNode>,
        right: Box<LGBNode>,
    },
}

impl LGBNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        match self {
            LGBNode::Leaf { value } => *value,
            LGBNode::Split { feature, threshold, left, right } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            LGBNode::Leaf { .. } => 1,
            LGBNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

// ---- Tree building utilities ----

fn compute_leaf_weight(g: f64, h: f64, lambda: f64, alpha: f64) -> f64 {
    let denom = h + lambda;
    if denom <= 0.0 {
        return 0.0;
    }
    let g_adj = if g.abs() <= alpha { 0.0 } else { g - alpha * g.signum() };
    -g_adj / denom
}

fn compute_gain_single(g: f64, h: f64, lambda: f64) -> f64 {
    let denom = h + lambda;
    if denom <= 0.0 {
        0.0
    } else {
        g * g / denom
    }
}

fn make_leaf(gradients: &[f64], hessians: &[f64], indices: &[usize], lambda: f64, alpha: f64) -> LGBNode {
    let g: f64 = indices.iter().map(|&i| gradients[i]).sum();
    let h: f64 = indices.iter().map(|&i| hessians[i]).sum();
    LGBNode::Leaf { value: compute_leaf_weight(g, h, lambda, alpha) }
}

struct CandidateSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
    left_indices: Vec<usize>,
    right_indices: Vec<usize>,
}

fn find_best_split_for_feature(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    feature: usize,
    config: &LightGBMConfig,
) -> Option<CandidateSplit> {
    let mut sorted: Vec<(usize, f64)> = indices.iter().map(|&i| (i, x[[i, feature]])).collect();
    sorted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let total_g: f64 = indices.iter().map(|&i| gradients[i]).sum();
    let total_h: f64 = indices.iter().map(|&i| hessians[i]).sum();
    let base_score = compute_gain_single(total_g, total_h, config.reg_lambda);
    let min_child = config.min_child_samples.max(1);

    let mut left_g = 0.0;
    let mut left_h = 0.0;
    let mut best: Option<(f64, f64, usize)> = None;

    for i in 0..sorted.len().saturating_sub(1) {
        left_g += gradients[sorted[i].0];
        left_h += hessians[sorted[i].0];

        if i + 1 < min_child || sorted.len() - i - 1 < min_child {
            continue;
        }
        if sorted[i].1 == sorted[i + 1].1 {
            continue;
        }

        let gain = compute_gain_single(left_g, left_h, config.reg_lambda)
            + compute_gain_single(total_g - left_g, total_h - left_h, config.reg_lambda)
            - base_score;

        if best.map_or(true, |(g, _, _)| gain > g) {
            best = Some((gain, (sorted[i].1 + sorted[i + 1].1) / 2.0, i + 1));
        }
    }

    let (gain, threshold, pos) = best.filter(|(g, _, _)| *g > 0.0)?;
    Some(CandidateSplit {
        feature,
        threshold,
        gain,
        left_indices: sorted[..pos].iter().map(|&(i, _)| i).collect(),
        right_indices: sorted[pos..].iter().map(|&(i, _)| i).collect(),
    })
}

fn best_split(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    feature_indices: &[usize],
    config: &LightGBMConfig,
) -> Option<CandidateSplit> {
    if indices.len() < config.min_child_samples.max(1) * 2 {
        return None;
    }
    feature_indices
        .par_iter()
        .filter_map(|&feat| find_best_split_for_feature(x, gradients, hessians, indices, feat, config))
        .max_by(|a, b| a.gain.partial_cmp(&b.gain).unwrap_or(Ordering::Equal))
}

/// A leaf waiting to be split, ordered by gain
struct PendingSplit {
    node_id: usize,
    split: CandidateSplit,
}

impl PartialEq for PendingSplit {
    fn eq(&self, other: &Self) -> bool {
        self.split.gain == other.split.gain
    }
}
impl Eq for PendingSplit {}
impl PartialOrd for PendingSplit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PendingSplit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.split.gain.partial_cmp(&other.split.gain).unwrap_or(Ordering::Equal)
    }
}

enum NodeSlot {
    Leaf(Vec<usize>),
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

/// Build a tree using leaf-wise (best-first) growth
fn build_lgb_tree(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    feature_indices: &[usize],
    config: &LightGBMConfig,
) -> LGBNode {
    let max_depth = config.depth_limit();
    let mut nodes: Vec<NodeSlot> = vec![NodeSlot::Leaf(indices.to_vec())];
    let mut depths: Vec<usize> = vec![0];
    let mut heap: BinaryHeap<PendingSplit> = BinaryHeap::new();

    if max_depth > 0 {
        if let Some(split) = best_split(x, gradients, hessians, indices, feature_indices, config) {
            heap.push(PendingSplit { node_id: 0, split });
        }
    }

    let mut n_leaves = 1usize;
    while n_leaves < config.num_leaves {
        let Some(PendingSplit { node_id, split }) = heap.pop() else {
            break;
        };

        let depth = depths[node_id] + 1;
        let left_id = nodes.len();
        let right_id = left_id + 1;
        nodes[node_id] = NodeSlot::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_id,
            right: right_id,
        };
        n_leaves += 1;

        for (child_id, child_indices) in [(left_id, &split.left_indices), (right_id, &split.right_indices)] {
            if depth < max_depth {
                if let Some(child_split) =
                    best_split(x, gradients, hessians, child_indices, feature_indices, config)
                {
                    heap.push(PendingSplit { node_id: child_id, split: child_split });
                }
            }
        }

        nodes.push(NodeSlot::Leaf(split.left_indices));
        nodes.push(NodeSlot::Leaf(split.right_indices));
        depths.push(depth);
        depths.push(depth);
    }

    fn to_node(nodes: &[NodeSlot], idx: usize, g: &[f64], h: &[f64], config: &LightGBMConfig) -> LGBNode {
        match &nodes[idx] {
            NodeSlot::Leaf(indices) => make_leaf(g, h, indices, config.reg_lambda, config.reg_alpha),
            NodeSlot::Split { feature, threshold, left, right } => LGBNode::Split {
                feature: *feature,
                threshold: *threshold,
                left: Box::new(to_node(nodes, *left, g, h, config)),
                right: Box::new(to_node(nodes, *right, g, h, config)),
            },
        }
    }
    to_node(&nodes, 0, gradients, hessians, config)
}

/// GOSS row selection. Returns the kept rows and the rows drawn from the
/// small-gradient remainder, which must be amplified by `(1 - a) / b`.
fn goss_sample(
    gradients: &[f64],
    top_rate: f64,
    other_rate: f64,
    rng: &mut Xoshiro256PlusPlus,
) -> (Vec<usize>, Vec<usize>) {
    let n = gradients.len();
    let n_top = ((n as f64 * top_rate).ceil() as usize).min(n);
    let n_other = (n as f64 * other_rate).ceil() as usize;

    let mut sorted: Vec<usize> = (0..n).collect();
    sorted.sort_by(|&a, &b| {
        gradients[b].abs().partial_cmp(&gradients[a].abs()).unwrap_or(Ordering::Equal)
    });
    let mut remaining = sorted.split_off(n_top);
    remaining.shuffle(rng);
    remaining.truncate(n_other);

    let mut selected = sorted;
    selected.extend(remaining.iter().copied());
    (selected, remaining)
}

// ============ LightGBM Regressor ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightGBMRegressor {
    config: LightGBMConfig,
    trees: Vec<LGBNode>,
    base_prediction: f64,
    n_features: Option<usize>,
}

impl LightGBMRegressor {
    pub fn new(config: LightGBMConfig) -> Self {
        Self { config, trees: Vec::new(), base_prediction: 0.0, n_features: None }
    }

    pub fn config(&self) -> &LightGBMConfig {
        &self.config
    }

    /// Leaf count of every tree, in boosting order
    pub fn leaves_per_tree(&self) -> Vec<usize> {
        self.trees.iter().map(LGBNode::n_leaves).collect()
    }

    fn round_rows(
        &self,
        round: usize,
        bag: &mut Vec<usize>,
        gradients: &mut [f64],
        hessians: &mut [f64],
        rng: &mut Xoshiro256PlusPlus,
    ) -> Vec<usize> {
        let n = gradients.len();
        match self.config.boosting_type {
            BoostingType::Goss => {
                let (rows, amplified) =
                    goss_sample(gradients, self.config.top_rate, self.config.other_rate, rng);
                if self.config.other_rate > 0.0 {
                    let factor = (1.0 - self.config.top_rate) / self.config.other_rate;
                    for &i in &amplified {
                        gradients[i] *= factor;
                        hessians[i] *= factor;
                    }
                }
                rows
            }
            BoostingType::Gbdt => {
                if !self.config.bagging_enabled() {
                    return (0..n).collect();
                }
                if round % self.config.subsample_freq == 0 {
                    *bag = super::xgboost::subsample(rng, n, self.config.subsample);
                }
                bag.clone()
            }
        }
    }
}

impl Regressor for LightGBMRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.config.validate()?;

        let n = x.nrows();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state.unwrap_or(42));
        self.base_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n, self.base_prediction);
        self.trees.clear();
        let mut bag: Vec<usize> = (0..n).collect();

        for round in 0..self.config.n_estimators {
            let mut gradients: Vec<f64> =
                predictions.iter().zip(y.iter()).map(|(&p, &yi)| p - yi).collect();
            let mut hessians: Vec<f64> = vec![1.0; n];

            let rows = self.round_rows(round, &mut bag, &mut gradients, &mut hessians, &mut rng);
            let features =
                super::xgboost::subsample(&mut rng, x.ncols(), self.config.colsample_bytree);

            let tree = build_lgb_tree(x, &gradients, &hessians, &rows, &features, &self.config);
            for (i, row) in x.rows().into_iter().enumerate() {
                predictions[i] += self.config.learning_rate * tree.predict(row);
            }
            self.trees.push(tree);
        }

        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_predict_input("LightGBMRegressor", self.n_features, x)?;
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

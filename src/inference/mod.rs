//! Inference module
//!
//! Loads the persisted regressors and produces per-model and averaged
//! lifetime-value predictions for a feature table.

mod predictor;

pub use predictor::{Predictor, AVERAGE_COLUMN};

//! Error types for the ltv360 pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, LtvError>;

/// Main error type for the pipeline library
#[derive(Error, Debug)]
pub enum LtvError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Preprocessing error: {0}")]
    Preprocessing(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("{0} must be fitted before use")]
    NotFitted(&'static str),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("No models loaded from {0}. Please train models first.")]
    NoModelsAvailable(String),

    #[error("Only {loaded} model(s) available, at least {required} required")]
    InsufficientModels { loaded: usize, required: usize },
}

impl LtvError {
    /// Configuration errors are never worth retrying
    pub fn is_config_error(&self) -> bool {
        matches!(self, LtvError::Config(_) | LtvError::UnknownModel(_))
    }
}

impl From<polars::error::PolarsError> for LtvError {
    fn from(err: polars::error::PolarsError) -> Self {
        LtvError::Data(err.to_string())
    }
}

impl From<serde_yaml::Error> for LtvError {
    fn from(err: serde_yaml::Error) -> Self {
        LtvError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for LtvError {
    fn from(err: serde_json::Error) -> Self {
        LtvError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for LtvError {
    fn from(err: bincode::Error) -> Self {
        LtvError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for LtvError {
    fn from(err: ndarray::ShapeError) -> Self {
        LtvError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

//! Artifact persistence
//!
//! Fitted models and the fitted feature generator are stored as bincode
//! envelopes tagged with a format version and the crate version that wrote
//! them.

mod serializer;

pub use serializer::{
    load_artifact, model_artifact_path, preprocessor_artifact_path, save_artifact,
    ArtifactEnvelope, ARTIFACT_FORMAT_VERSION, PREPROCESSOR_FILE,
};

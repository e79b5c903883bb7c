//! Binary artifact envelope

use crate::error::{LtvError, Result};
use crate::training::ModelKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Bumped whenever the on-disk layout of a payload changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// File name of the fitted feature generator inside the output directory
pub const PREPROCESSOR_FILE: &str = "preprocessor.joblib";

/// Versioned wrapper written around every persisted payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEnvelope<T> {
    pub format_version: u32,
    pub crate_version: String,
    pub payload: T,
}

/// `<output_dir>/<kind>_model.joblib`
pub fn model_artifact_path(output_dir: &Path, kind: ModelKind) -> PathBuf {
    output_dir.join(format!("{}_model.joblib", kind))
}

/// `<output_dir>/preprocessor.joblib`
pub fn preprocessor_artifact_path(output_dir: &Path) -> PathBuf {
    output_dir.join(PREPROCESSOR_FILE)
}

/// Serialize `payload` to `path`, creating parent directories as needed
pub fn save_artifact<T: Serialize>(payload: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let envelope = ArtifactEnvelope {
        format_version: ARTIFACT_FORMAT_VERSION,
        crate_version: env!("CARGO_PKG_VERSION").to_string(),
        payload,
    };

    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, &envelope)?;
    writer.flush()?;

    debug!("Wrote artifact {}", path.display());
    Ok(())
}

/// Read a payload written by [`save_artifact`]
pub fn load_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    let envelope: ArtifactEnvelope<T> = bincode::deserialize_from(reader).map_err(|e| {
        LtvError::Serialization(format!("Failed to read {}: {}", path.display(), e))
    })?;

    if envelope.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(LtvError::Serialization(format!(
            "{} has artifact format v{}, expected v{}",
            path.display(),
            envelope.format_version,
            ARTIFACT_FORMAT_VERSION
        )));
    }
    if envelope.crate_version != env!("CARGO_PKG_VERSION") {
        warn!(
            "{} was written by ltv360 {}, running {}",
            path.display(),
            envelope.crate_version,
            env!("CARGO_PKG_VERSION")
        );
    }

    Ok(envelope.payload)
}

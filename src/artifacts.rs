//! Locations of the trained artifacts and helpers for reading them.
//!
//! The artifact set is produced offline and is read-only for this service.

use crate::error::{PredictionError, PredictionResult};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

pub const REGRESSION_MODEL_FILE: &str = "regression_model.onnx";
pub const CLASSIFICATION_MODEL_FILE: &str = "classification_model.onnx";
pub const REGRESSION_SCALER_FILE: &str = "scaler_reg.json";
pub const CLASSIFICATION_SCALER_FILE: &str = "scaler_clf.json";
pub const LABEL_ENCODERS_FILE: &str = "label_encoders.json";
pub const CONDITION_ENCODER_FILE: &str = "condition_encoder.json";

/// Paths of every artifact the predictor loads at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub regression_model: PathBuf,
    pub classification_model: PathBuf,
    pub regression_scaler: PathBuf,
    pub classification_scaler: PathBuf,
    pub label_encoders: PathBuf,
    pub condition_encoder: PathBuf,
}

impl ArtifactPaths {
    /// Standard file layout inside a models directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            regression_model: dir.join(REGRESSION_MODEL_FILE),
            classification_model: dir.join(CLASSIFICATION_MODEL_FILE),
            regression_scaler: dir.join(REGRESSION_SCALER_FILE),
            classification_scaler: dir.join(CLASSIFICATION_SCALER_FILE),
            label_encoders: dir.join(LABEL_ENCODERS_FILE),
            condition_encoder: dir.join(CONDITION_ENCODER_FILE),
        }
    }

    /// All artifact paths, in load order.
    pub fn all(&self) -> [&Path; 6] {
        [
            &self.regression_model,
            &self.classification_model,
            &self.regression_scaler,
            &self.classification_scaler,
            &self.label_encoders,
            &self.condition_encoder,
        ]
    }

    /// Fail with `ArtifactMissing` for the first path that is not a file.
    pub fn ensure_present(&self) -> PredictionResult<()> {
        match self.all().into_iter().find(|path| !path.is_file()) {
            Some(path) => Err(PredictionError::ArtifactMissing {
                path: path.to_path_buf(),
            }),
            None => Ok(()),
        }
    }
}

/// Read and deserialize a JSON artifact.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> PredictionResult<T> {
    if !path.is_file() {
        return Err(PredictionError::ArtifactMissing {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| PredictionError::ArtifactInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    serde_json::from_str(&content).map_err(|e| PredictionError::ArtifactInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

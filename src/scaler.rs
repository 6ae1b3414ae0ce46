//! Standard scalers fitted alongside the models.
//!
//! The tree ensembles currently served do not need scaled inputs, so inference
//! never applies these. They are still loaded and validated so a model that
//! does need them can be swapped in without changing the artifact set.

use crate::artifacts::read_json;
use crate::error::{PredictionError, PredictionResult};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-column `(x - mean) / scale` transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Load a scaler and check it matches the model's column count.
    pub fn load(path: &Path, num_features: usize) -> PredictionResult<Self> {
        let scaler: Self = read_json(path)?;
        scaler
            .validate(num_features)
            .map_err(|reason| PredictionError::ArtifactInvalid {
                path: path.to_path_buf(),
                reason,
            })?;
        Ok(scaler)
    }

    pub fn validate(&self, num_features: usize) -> std::result::Result<(), String> {
        if self.mean.len() != num_features || self.scale.len() != num_features {
            return Err(format!(
                "expected {num_features} columns, got mean={} scale={}",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err("non-finite scaler parameter".to_string());
        }
        Ok(())
    }

    pub fn num_features(&self) -> usize {
        self.mean.len()
    }

    /// Scale each row; zero-variance columns are only centred.
    pub fn transform(&self, features: ArrayView2<'_, f32>) -> Array2<f32> {
        let mut out = features.to_owned();
        for mut row in out.axis_iter_mut(Axis(0)) {
            for (col, value) in row.iter_mut().enumerate() {
                let mean = self.mean.get(col).copied().unwrap_or(0.0);
                let scale = match self.scale.get(col).copied() {
                    Some(s) if s != 0.0 => s,
                    _ => 1.0,
                };
                *value = ((*value as f64 - mean) / scale) as f32;
            }
        }
        out
    }
}

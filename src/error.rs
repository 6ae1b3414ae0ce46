//! Error types for the prediction core.
//!
//! Unknown categorical values are deliberately absent here: they are
//! substituted with the fallback code and reported as warnings instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used by the predictor and the HTTP surface.
pub type PredictionResult<T> = std::result::Result<T, PredictionError>;

/// Failures surfaced by loading artifacts or serving a prediction.
#[derive(Error, Debug)]
pub enum PredictionError {
    /// An artifact file does not exist on disk.
    #[error("Model artifact not found: {}", path.display())]
    ArtifactMissing { path: PathBuf },

    /// An artifact file exists but could not be parsed or fails validation.
    #[error("Invalid model artifact {}: {reason}", path.display())]
    ArtifactInvalid { path: PathBuf, reason: String },

    /// The request lacks one or more fields required by the model's input layout.
    #[error("Missing required fields: {}", fields.join(", "))]
    MissingRequiredField { fields: Vec<String> },

    /// A numeric field carried something that is not a number.
    #[error("Invalid value for field '{field}': {value}")]
    InvalidFieldValue { field: String, value: String },

    /// The underlying model call failed or produced unusable output.
    #[error("Model invocation failed: {0}")]
    ModelInvocation(String),
}

impl PredictionError {
    /// Whether the failure was caused by the request rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingRequiredField { .. } | Self::InvalidFieldValue { .. }
        )
    }

    pub(crate) fn missing<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingRequiredField {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

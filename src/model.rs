//! Model runtimes behind the predictor.
//!
//! [`Regressor`] and [`Classifier`] are the seams the predictor depends on.
//! The production implementations run ONNX exports of the trained tree
//! ensembles; tests substitute in-memory models.

use crate::Result;
use anyhow::{anyhow, Context};
use ndarray::ArrayView2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;

/// Scalar regression model over a single feature row.
pub trait Regressor: Send + Sync {
    /// Label reported to callers as `model_used`.
    fn name(&self) -> &str;

    /// Predict one value for a `(1, n)` row.
    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<f64>;
}

/// Output of one classification call.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassOutput {
    /// Model-native (encoded) class label.
    pub label: i64,
    /// Per-class probabilities in encoder class order, when the model exposes them.
    pub probabilities: Option<Vec<f32>>,
}

/// Classification model over a single feature row.
pub trait Classifier: Send + Sync {
    /// Label reported to callers as `model_used`.
    fn name(&self) -> &str;

    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<ClassOutput>;
}

/// Build an ONNX Runtime session for a model file.
fn build_session(path: &Path) -> Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(1)? // Single-row inputs gain nothing from intra-op threads
        .commit_from_file(path)
        .with_context(|| format!("failed to load ONNX model {}", path.display()))?;
    Ok(session)
}

/// Configured label, else the ONNX graph name, else the file stem.
fn resolve_name(session: &Session, path: &Path, label: Option<&str>) -> String {
    if let Some(label) = label {
        return label.to_string();
    }

    session
        .metadata()
        .ok()
        .and_then(|metadata| metadata.name().ok())
        .filter(|name| !name.is_empty())
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "onnx".to_string())
}

/// ONNX regressor; the first output must hold the predicted value.
pub struct OnnxRegressor {
    session: Mutex<Session>,
    name: String,
}

impl OnnxRegressor {
    pub fn load(path: &Path, label: Option<&str>) -> Result<Self> {
        let session = build_session(path)?;
        let name = resolve_name(&session, path, label);
        Ok(Self {
            session: Mutex::new(session),
            name,
        })
    }
}

impl Regressor for OnnxRegressor {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<f64> {
        let input = Tensor::from_array(features.to_owned())?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("regression session lock poisoned"))?;
        let outputs = session.run(ort::inputs![input])?;

        let (_, data) = outputs[0].try_extract_tensor::<f32>()?;
        let value = data
            .first()
            .copied()
            .ok_or_else(|| anyhow!("regression model returned an empty tensor"))?;

        Ok(f64::from(value))
    }
}

/// ONNX classifier.
///
/// Expects the layout of a classifier exported with probability maps
/// disabled: output 0 is the `int64` label, output 1 (optional) is a
/// `[1, n_classes]` float probability tensor.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    name: String,
}

impl OnnxClassifier {
    pub fn load(path: &Path, label: Option<&str>) -> Result<Self> {
        let session = build_session(path)?;
        let name = resolve_name(&session, path, label);
        Ok(Self {
            session: Mutex::new(session),
            name,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: ArrayView2<'_, f32>) -> Result<ClassOutput> {
        let input = Tensor::from_array(features.to_owned())?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("classification session lock poisoned"))?;
        let outputs = session.run(ort::inputs![input])?;

        let (_, labels) = outputs[0].try_extract_tensor::<i64>()?;
        let label = labels
            .first()
            .copied()
            .ok_or_else(|| anyhow!("classification model returned no label"))?;

        let probabilities = if outputs.len() > 1 {
            let (_, probs) = outputs[1].try_extract_tensor::<f32>()?;
            Some(probs.to_vec())
        } else {
            None
        };

        Ok(ClassOutput {
            label,
            probabilities,
        })
    }
}

//! Inference service for vehicle price and condition prediction.
//!
//! This crate encodes loosely-typed JSON feature records into the fixed-order
//! rows expected by two offline-trained tree ensembles (a price regressor and
//! a condition classifier), runs them through ONNX Runtime, and serves the
//! results over a small REST API.

pub mod artifacts;
pub mod config;
pub mod encoders;
pub mod error;
pub mod features;
pub mod model;
pub mod predictor;
pub mod scaler;
pub mod server;

pub use artifacts::ArtifactPaths;
pub use config::ServiceConfig;
pub use encoders::{CategoryEncoder, ConditionEncoder, EncodingWarning, FeatureEncoders};
pub use error::{PredictionError, PredictionResult};
pub use features::FeatureRecord;
pub use model::{ClassOutput, Classifier, Regressor};
pub use predictor::{
    ConditionPrediction, FeatureInfo, ModelLabels, PricePrediction, VehiclePredictor,
};
pub use server::{router, AppState};

/// Error type for model runtime and configuration plumbing.
pub type Result<T> = anyhow::Result<T>;

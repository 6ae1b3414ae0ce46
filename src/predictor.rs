//! Vehicle price and condition prediction.
//!
//! Provides [`VehiclePredictor`], the immutable context holding the loaded
//! models and encoders. It is built once at startup and shared read-only
//! with every request.

use crate::artifacts::ArtifactPaths;
use crate::encoders::{ConditionEncoder, EncodingWarning, FeatureEncoders};
use crate::error::{PredictionError, PredictionResult};
use crate::features::{
    assemble, required_fields, FeatureRecord, CATEGORICAL_FEATURES, CONDITION,
    CONDITION_FEATURE_ORDER, NUM_FEATURES, PRICE_FEATURE_ORDER, REFERENCE_YEAR,
};
use crate::model::{Classifier, OnnxClassifier, OnnxRegressor, Regressor};
use crate::scaler::StandardScaler;
use serde::Serialize;
use std::collections::BTreeMap;

/// Currency reported with price predictions.
pub const CURRENCY: &str = "USD";

/// Name of the categorical encoding scheme, reported by `feature_info`.
pub const ENCODING_METHOD: &str = "LabelEncoder (same as training notebook)";

/// Allowed deviation of a raw probability distribution's sum from 1.
const PROBABILITY_SUM_TOLERANCE: f64 = 0.01;

/// Optional display labels overriding the names read from the model files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelLabels {
    pub regression: Option<String>,
    pub classification: Option<String>,
}

/// Result of a price prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePrediction {
    pub predicted_price: f64,
    pub model_used: String,
    pub currency: &'static str,
    /// Unknown categories that were replaced by the fallback code.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub encoding_warnings: Vec<EncodingWarning>,
}

/// Result of a condition prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionPrediction {
    pub predicted_condition: String,
    pub model_used: String,
    /// One entry per known condition class, summing to 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub encoding_warnings: Vec<EncodingWarning>,
}

/// Required inputs of one prediction type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureGroup {
    pub required: Vec<&'static str>,
    pub description: &'static str,
}

/// Static description of both models' inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureInfo {
    pub regression_features: FeatureGroup,
    pub classification_features: FeatureGroup,
    pub encoding_method: &'static str,
    pub current_year: i32,
}

/// Loaded models, scalers and encoders.
pub struct VehiclePredictor {
    regressor: Box<dyn Regressor>,
    classifier: Box<dyn Classifier>,
    feature_encoders: FeatureEncoders,
    condition_encoder: ConditionEncoder,
    regression_scaler: Option<StandardScaler>,
    classification_scaler: Option<StandardScaler>,
}

impl VehiclePredictor {
    /// Assemble a predictor from already-loaded parts.
    ///
    /// Fails with `ArtifactInvalid` if any categorical input lacks an encoder.
    pub fn new(
        regressor: Box<dyn Regressor>,
        classifier: Box<dyn Classifier>,
        feature_encoders: FeatureEncoders,
        condition_encoder: ConditionEncoder,
    ) -> PredictionResult<Self> {
        let absent: Vec<&str> = CATEGORICAL_FEATURES
            .iter()
            .copied()
            .filter(|feature| feature_encoders.get(feature).is_none())
            .collect();
        if !absent.is_empty() {
            return Err(PredictionError::ArtifactInvalid {
                path: "label_encoders".into(),
                reason: format!("no encoder for {}", absent.join(", ")),
            });
        }

        Ok(Self {
            regressor,
            classifier,
            feature_encoders,
            condition_encoder,
            regression_scaler: None,
            classification_scaler: None,
        })
    }

    /// Attach the scalers fitted with each model. They are kept, not applied.
    pub fn with_scalers(
        mut self,
        regression: StandardScaler,
        classification: StandardScaler,
    ) -> Self {
        self.regression_scaler = Some(regression);
        self.classification_scaler = Some(classification);
        self
    }

    /// Load every artifact from disk.
    ///
    /// # Arguments
    /// * `paths` - Artifact locations
    /// * `labels` - Optional `model_used` overrides
    ///
    /// # Example
    /// ```no_run
    /// use vehicle_inference::{ArtifactPaths, ModelLabels, VehiclePredictor};
    ///
    /// let paths = ArtifactPaths::in_dir("models");
    /// let predictor = VehiclePredictor::load(&paths, &ModelLabels::default()).unwrap();
    /// ```
    pub fn load(paths: &ArtifactPaths, labels: &ModelLabels) -> PredictionResult<Self> {
        paths.ensure_present()?;

        let regressor = OnnxRegressor::load(&paths.regression_model, labels.regression.as_deref())
            .map_err(|e| PredictionError::ArtifactInvalid {
                path: paths.regression_model.clone(),
                reason: format!("{e:#}"),
            })?;
        tracing::info!(model = regressor.name(), "regression model loaded");

        let classifier =
            OnnxClassifier::load(&paths.classification_model, labels.classification.as_deref())
                .map_err(|e| PredictionError::ArtifactInvalid {
                    path: paths.classification_model.clone(),
                    reason: format!("{e:#}"),
                })?;
        tracing::info!(model = classifier.name(), "classification model loaded");

        let regression_scaler = StandardScaler::load(&paths.regression_scaler, NUM_FEATURES)?;
        let classification_scaler =
            StandardScaler::load(&paths.classification_scaler, NUM_FEATURES)?;
        tracing::info!("scalers loaded");

        let feature_encoders = FeatureEncoders::load(&paths.label_encoders)?;
        tracing::info!(features = feature_encoders.len(), "label encoders loaded");

        let condition_encoder = ConditionEncoder::load(&paths.condition_encoder)?;
        tracing::info!(classes = condition_encoder.len(), "condition encoder loaded");

        Ok(Self::new(
            Box::new(regressor),
            Box::new(classifier),
            feature_encoders,
            condition_encoder,
        )?
        .with_scalers(regression_scaler, classification_scaler))
    }

    /// Predict the listing price of a vehicle.
    pub fn predict_price(&self, record: &FeatureRecord) -> PredictionResult<PricePrediction> {
        let vector = assemble(
            record,
            &PRICE_FEATURE_ORDER,
            &self.feature_encoders,
            Some(&self.condition_encoder),
        )?;

        let model = self.regressor.name();
        let price = self
            .regressor
            .predict(vector.values.view())
            .map_err(|e| invocation_failure(model, e))?;
        if !price.is_finite() {
            return Err(invocation_failure(
                model,
                anyhow::anyhow!("non-finite prediction {price}"),
            ));
        }

        tracing::debug!(model, price, fallbacks = vector.warnings.len(), "price predicted");

        Ok(PricePrediction {
            predicted_price: price,
            model_used: model.to_string(),
            currency: CURRENCY,
            encoding_warnings: vector.warnings,
        })
    }

    /// Predict the condition class of a vehicle. Any `condition` input is ignored.
    pub fn predict_condition(
        &self,
        record: &FeatureRecord,
    ) -> PredictionResult<ConditionPrediction> {
        let vector = assemble(record, &CONDITION_FEATURE_ORDER, &self.feature_encoders, None)?;

        let model = self.classifier.name();
        let output = self
            .classifier
            .predict(vector.values.view())
            .map_err(|e| invocation_failure(model, e))?;

        let condition = self.condition_encoder.decode(output.label).ok_or_else(|| {
            invocation_failure(
                model,
                anyhow::anyhow!("label {} outside the condition classes", output.label),
            )
        })?;

        let probabilities = output
            .probabilities
            .as_deref()
            .map(|raw| self.class_probabilities(raw))
            .transpose()
            .map_err(|e| invocation_failure(model, e))?;

        tracing::debug!(model, condition, fallbacks = vector.warnings.len(), "condition predicted");

        Ok(ConditionPrediction {
            predicted_condition: condition.to_string(),
            model_used: model.to_string(),
            probabilities,
            encoding_warnings: vector.warnings,
        })
    }

    /// Every categorical feature's trained classes, including `condition`.
    pub fn valid_categories(&self) -> BTreeMap<String, Vec<String>> {
        let mut categories = self.feature_encoders.classes();
        categories.insert(
            CONDITION.to_string(),
            self.condition_encoder.classes().to_vec(),
        );
        categories
    }

    /// Required inputs per prediction type and the encoding in use.
    pub fn feature_info(&self) -> FeatureInfo {
        feature_info()
    }

    pub fn regression_model(&self) -> &str {
        self.regressor.name()
    }

    pub fn classification_model(&self) -> &str {
        self.classifier.name()
    }

    pub fn regression_scaler(&self) -> Option<&StandardScaler> {
        self.regression_scaler.as_ref()
    }

    pub fn classification_scaler(&self) -> Option<&StandardScaler> {
        self.classification_scaler.as_ref()
    }

    /// Key raw probabilities by condition class and renormalise them.
    fn class_probabilities(&self, raw: &[f32]) -> anyhow::Result<BTreeMap<String, f64>> {
        let classes = self.condition_encoder.classes();
        if raw.len() != classes.len() {
            anyhow::bail!(
                "{} probabilities for {} condition classes",
                raw.len(),
                classes.len()
            );
        }
        if raw.iter().any(|p| !p.is_finite() || *p < 0.0) {
            anyhow::bail!("invalid probability in {raw:?}");
        }

        let sum: f64 = raw.iter().map(|p| f64::from(*p)).sum();
        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            anyhow::bail!("invalid probability distribution: sum = {sum}");
        }

        Ok(classes
            .iter()
            .zip(raw)
            .map(|(class, p)| (class.clone(), f64::from(*p) / sum))
            .collect())
    }
}

/// Static input description shared by every predictor.
pub fn feature_info() -> FeatureInfo {
    FeatureInfo {
        regression_features: FeatureGroup {
            required: required_fields(&PRICE_FEATURE_ORDER),
            description: "Features needed for price prediction (16 total)",
        },
        classification_features: FeatureGroup {
            required: required_fields(&CONDITION_FEATURE_ORDER),
            description: "Features needed for condition prediction (16 total, excluding condition)",
        },
        encoding_method: ENCODING_METHOD,
        current_year: REFERENCE_YEAR,
    }
}

/// Log the model failure in full and hide the detail behind a typed error.
fn invocation_failure(model: &str, err: anyhow::Error) -> PredictionError {
    let detail = format!("{err:#}");
    tracing::error!(model, error = %detail, "model invocation failed");
    PredictionError::ModelInvocation(detail)
}

//! Feature records and model input assembly.
//!
//! Translates a loosely-typed JSON record into the fixed-order numeric row the
//! offline-trained models expect.
//!
//! **Critical for correctness**: the field orders below are part of each
//! model's training contract. Reordering them produces wrong predictions with
//! no runtime error.

use crate::encoders::{ConditionEncoder, EncodingWarning, FeatureEncoders};
use crate::error::{PredictionError, PredictionResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Year the models were trained in; `vehicle_age` is measured against it.
pub const REFERENCE_YEAR: i32 = 2021;

pub const VEHICLE_AGE: &str = "vehicle_age";
pub const YEAR: &str = "year";
pub const CONDITION: &str = "condition";
pub const PRICE: &str = "price";

/// Number of columns in either model's input row.
pub const NUM_FEATURES: usize = 16;

/// Input layout of the price regressor.
pub const PRICE_FEATURE_ORDER: [&str; NUM_FEATURES] = [
    "year",
    "vehicle_age",
    "odometer",
    "lat",
    "long",
    "manufacturer",
    "fuel",
    "title_status",
    "transmission",
    "drive",
    "size",
    "type",
    "paint_color",
    "state",
    "region",
    "condition",
];

/// Input layout of the condition classifier.
pub const CONDITION_FEATURE_ORDER: [&str; NUM_FEATURES] = [
    "price",
    "year",
    "vehicle_age",
    "odometer",
    "lat",
    "long",
    "manufacturer",
    "fuel",
    "title_status",
    "transmission",
    "drive",
    "size",
    "type",
    "paint_color",
    "state",
    "region",
];

/// Categorical inputs encoded through the per-feature encoder map.
pub const CATEGORICAL_FEATURES: [&str; 10] = [
    "manufacturer",
    "fuel",
    "title_status",
    "transmission",
    "drive",
    "size",
    "type",
    "paint_color",
    "state",
    "region",
];

/// Caller-supplied fields of a model's input layout (`vehicle_age` is derived).
pub fn required_fields(order: &[&'static str]) -> Vec<&'static str> {
    order
        .iter()
        .copied()
        .filter(|field| *field != VEHICLE_AGE)
        .collect()
}

/// A single request's features, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRecord(Map<String, Value>);

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value; `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Builder-style insert, convenient for constructing records in code.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.to_string(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fields from `fields` absent in this record, in the order given.
    pub fn missing_fields(&self, fields: &[&str]) -> Vec<String> {
        fields
            .iter()
            .filter(|field| !self.contains(field))
            .map(|field| field.to_string())
            .collect()
    }

    /// Caller-supplied `vehicle_age`, else `REFERENCE_YEAR - year`.
    ///
    /// Returns `Ok(None)` when neither field is present.
    pub fn vehicle_age(&self) -> PredictionResult<Option<f64>> {
        if let Some(value) = self.get(VEHICLE_AGE) {
            return numeric_value(VEHICLE_AGE, value).map(Some);
        }
        match self.get(YEAR) {
            Some(year) => Ok(Some(f64::from(REFERENCE_YEAR) - numeric_value(YEAR, year)?)),
            None => Ok(None),
        }
    }
}

impl From<Map<String, Value>> for FeatureRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Read a numeric field; numbers and numeric strings are accepted.
pub fn numeric_value(field: &str, value: &Value) -> PredictionResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| PredictionError::InvalidFieldValue {
            field: field.to_string(),
            value: value.to_string(),
        })
}

/// Coerce a categorical value to the string form the encoders were fitted on.
///
/// Strings pass through; anything else uses its JSON text, so `null` and
/// `true` become `"null"` and `"true"`.
pub fn category_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A model-ready input row plus any encoding fallbacks applied to it.
#[derive(Debug, Clone)]
pub struct FeatureVector {
    /// Shape `(1, NUM_FEATURES)`.
    pub values: Array2<f32>,
    pub warnings: Vec<EncodingWarning>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        self.values.as_slice().unwrap_or(&[])
    }
}

/// Assemble the input row for a model.
///
/// # Arguments
/// * `record` - Raw request features
/// * `order` - The model's fixed field order
/// * `encoders` - Per-feature categorical encoders
/// * `condition` - Condition encoder, applied to the `condition` column when given
///
/// # Returns
/// The ordered row, or `MissingRequiredField` naming every absent field
pub fn assemble(
    record: &FeatureRecord,
    order: &[&str],
    encoders: &FeatureEncoders,
    condition: Option<&ConditionEncoder>,
) -> PredictionResult<FeatureVector> {
    // `vehicle_age` is never reported on its own: it is missing only when `year` is.
    let missing: Vec<String> = order
        .iter()
        .filter(|field| **field != VEHICLE_AGE && !record.contains(field))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PredictionError::missing(missing));
    }

    let mut row = Vec::with_capacity(order.len());
    let mut warnings = Vec::new();

    for &field in order {
        if field == VEHICLE_AGE {
            let age = record
                .vehicle_age()?
                .ok_or_else(|| PredictionError::missing([YEAR]))?;
            row.push(age as f32);
            continue;
        }

        let value = record
            .get(field)
            .ok_or_else(|| PredictionError::missing([field]))?;

        let encoded = match (field, condition) {
            (CONDITION, Some(encoder)) => Some(encoder.encode(&category_string(value))),
            _ => encoders.encode(field, &category_string(value)),
        };

        match encoded {
            Some(encoded) => {
                if encoded.fallback {
                    let raw = category_string(value);
                    tracing::warn!(
                        feature = field,
                        value = %raw,
                        substituted_code = encoded.code,
                        "unknown category, using fallback code"
                    );
                    warnings.push(EncodingWarning {
                        feature: field.to_string(),
                        value: raw,
                        substituted_code: encoded.code,
                    });
                }
                row.push(encoded.code as f32);
            }
            None => row.push(numeric_value(field, value)? as f32),
        }
    }

    let values = Array2::from_shape_vec((1, row.len()), row)
        .map_err(|e| PredictionError::ModelInvocation(e.to_string()))?;

    Ok(FeatureVector { values, warnings })
}

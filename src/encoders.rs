//! Categorical label encoders fitted during training.
//!
//! Two lookup structures are kept apart on purpose: [`FeatureEncoders`] maps
//! each categorical input feature to its encoder, while [`ConditionEncoder`]
//! serves the condition column, which is both an input of the price model and
//! the output label of the condition model.
//!
//! Codes are positions in the trained class list. Values outside that list are
//! not rejected: they receive [`FALLBACK_CODE`] and the caller is told through
//! [`Encoded::fallback`].

use crate::artifacts::read_json;
use crate::error::{PredictionError, PredictionResult};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Code substituted for categories the encoder was never fitted on.
pub const FALLBACK_CODE: u32 = 0;

/// Outcome of encoding a single categorical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoded {
    pub code: u32,
    /// True when the value was unknown and `FALLBACK_CODE` was used.
    pub fallback: bool,
}

/// Record of an unknown categorical value replaced by the fallback code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodingWarning {
    pub feature: String,
    pub value: String,
    pub substituted_code: u32,
}

/// Immutable string-to-code mapping for one categorical feature.
#[derive(Debug, Clone)]
pub struct CategoryEncoder {
    classes: Vec<String>,
    index: HashMap<String, u32>,
}

impl CategoryEncoder {
    /// Build an encoder from the trained class list.
    ///
    /// The order of `classes` is the training contract and is kept as given.
    /// Fails on an empty list or duplicate classes.
    pub fn new(classes: Vec<String>) -> std::result::Result<Self, String> {
        if classes.is_empty() {
            return Err("encoder has no classes".to_string());
        }

        let mut index = HashMap::with_capacity(classes.len());
        for (code, class) in classes.iter().enumerate() {
            if index.insert(class.clone(), code as u32).is_some() {
                return Err(format!("duplicate class '{class}'"));
            }
        }

        Ok(Self { classes, index })
    }

    /// Encode a value, falling back to `FALLBACK_CODE` when it is unknown.
    pub fn encode(&self, value: &str) -> Encoded {
        match self.index.get(value) {
            Some(&code) => Encoded {
                code,
                fallback: false,
            },
            None => Encoded {
                code: FALLBACK_CODE,
                fallback: true,
            },
        }
    }

    /// Class label for a code, if the code is in range.
    pub fn decode(&self, code: i64) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| self.classes.get(idx))
            .map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Per-feature encoders for the categorical model inputs.
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoders {
    encoders: BTreeMap<String, CategoryEncoder>,
}

impl FeatureEncoders {
    /// Build from a feature-to-classes map.
    pub fn from_classes(
        classes: BTreeMap<String, Vec<String>>,
    ) -> std::result::Result<Self, String> {
        let encoders = classes
            .into_iter()
            .map(|(feature, classes)| {
                CategoryEncoder::new(classes)
                    .map(|encoder| (feature.clone(), encoder))
                    .map_err(|reason| format!("{feature}: {reason}"))
            })
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;

        Ok(Self { encoders })
    }

    /// Load `label_encoders.json`: an object of feature name to ordered classes.
    pub fn load(path: &Path) -> PredictionResult<Self> {
        let classes: BTreeMap<String, Vec<String>> = read_json(path)?;
        Self::from_classes(classes).map_err(|reason| PredictionError::ArtifactInvalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn get(&self, feature: &str) -> Option<&CategoryEncoder> {
        self.encoders.get(feature)
    }

    /// Encode `value` for `feature`; `None` when the feature is not categorical.
    pub fn encode(&self, feature: &str, value: &str) -> Option<Encoded> {
        self.get(feature).map(|encoder| encoder.encode(value))
    }

    /// Names of every encoded feature.
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }

    /// Trained classes per feature.
    pub fn classes(&self) -> BTreeMap<String, Vec<String>> {
        self.encoders
            .iter()
            .map(|(feature, encoder)| (feature.clone(), encoder.classes().to_vec()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }
}

/// Bidirectional encoder for the vehicle condition label.
#[derive(Debug, Clone)]
pub struct ConditionEncoder {
    inner: CategoryEncoder,
}

impl ConditionEncoder {
    pub fn new(classes: Vec<String>) -> std::result::Result<Self, String> {
        CategoryEncoder::new(classes).map(|inner| Self { inner })
    }

    /// Load `condition_encoder.json`: an ordered array of condition classes.
    pub fn load(path: &Path) -> PredictionResult<Self> {
        let classes: Vec<String> = read_json(path)?;
        Self::new(classes).map_err(|reason| PredictionError::ArtifactInvalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn encode(&self, value: &str) -> Encoded {
        self.inner.encode(value)
    }

    /// Inverse transform of a model-native label code.
    pub fn decode(&self, code: i64) -> Option<&str> {
        self.inner.decode(code)
    }

    pub fn classes(&self) -> &[String] {
        self.inner.classes()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

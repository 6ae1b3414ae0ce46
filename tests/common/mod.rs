//! Shared fixtures: in-memory models and encoders shaped like the trained artifacts.

#![allow(dead_code)]

use ndarray::ArrayView2;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use vehicle_inference::{
    ClassOutput, Classifier, ConditionEncoder, FeatureEncoders, FeatureRecord, Regressor,
    VehiclePredictor,
};

pub const CONDITIONS: [&str; 6] = ["excellent", "fair", "good", "like new", "new", "salvage"];

/// Linear price model over the price feature row.
pub struct LinearPrice;

impl Regressor for LinearPrice {
    fn name(&self) -> &str {
        "LinearPrice"
    }

    fn predict(&self, features: ArrayView2<'_, f32>) -> vehicle_inference::Result<f64> {
        let row = features.row(0);
        let age = f64::from(row[1]);
        let odometer = f64::from(row[2]);
        let manufacturer = f64::from(row[5]);
        Ok(30_000.0 - 1_000.0 * age - 0.05 * odometer + 250.0 * manufacturer)
    }
}

/// Classifier scoring each condition by distance from an odometer anchor.
pub struct OdometerCondition;

impl Classifier for OdometerCondition {
    fn name(&self) -> &str {
        "OdometerCondition"
    }

    fn predict(&self, features: ArrayView2<'_, f32>) -> vehicle_inference::Result<ClassOutput> {
        let odometer = f64::from(features.row(0)[3]);
        let anchors = [40_000.0, 150_000.0, 90_000.0, 15_000.0, 1_000.0, 250_000.0];

        let scores: Vec<f64> = anchors
            .iter()
            .map(|anchor| (-((odometer - anchor).abs() / 50_000.0)).exp())
            .collect();
        let total: f64 = scores.iter().sum();
        let probabilities: Vec<f32> = scores.iter().map(|s| (s / total) as f32).collect();

        let label = probabilities
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx as i64)
            .unwrap_or(0);

        Ok(ClassOutput {
            label,
            probabilities: Some(probabilities),
        })
    }
}

/// Classifier without probability output.
pub struct LabelOnly(pub i64);

impl Classifier for LabelOnly {
    fn name(&self) -> &str {
        "LabelOnly"
    }

    fn predict(&self, _features: ArrayView2<'_, f32>) -> vehicle_inference::Result<ClassOutput> {
        Ok(ClassOutput {
            label: self.0,
            probabilities: None,
        })
    }
}

/// Regressor that always fails, as a broken runtime would.
pub struct Failing;

impl Regressor for Failing {
    fn name(&self) -> &str {
        "Failing"
    }

    fn predict(&self, _features: ArrayView2<'_, f32>) -> vehicle_inference::Result<f64> {
        anyhow::bail!("input shape mismatch: expected 17 columns")
    }
}

pub fn category_classes() -> BTreeMap<String, Vec<String>> {
    let table: [(&str, &[&str]); 10] = [
        ("manufacturer", &["chevrolet", "ford", "honda", "nissan", "toyota"]),
        ("fuel", &["diesel", "electric", "gas", "hybrid", "other"]),
        ("title_status", &["clean", "lien", "missing", "parts only", "rebuilt", "salvage"]),
        ("transmission", &["automatic", "manual", "other"]),
        ("drive", &["4wd", "fwd", "rwd"]),
        ("size", &["compact", "full-size", "mid-size", "sub-compact"]),
        ("type", &["coupe", "pickup", "sedan", "suv", "truck"]),
        ("paint_color", &["black", "blue", "grey", "red", "silver", "white"]),
        ("state", &["ca", "fl", "ga", "ny", "tx"]),
        ("region", &["atlanta", "los angeles", "new york city"]),
    ];

    table
        .iter()
        .map(|(feature, classes)| {
            (
                feature.to_string(),
                classes.iter().map(|c| c.to_string()).collect(),
            )
        })
        .collect()
}

pub fn feature_encoders() -> FeatureEncoders {
    FeatureEncoders::from_classes(category_classes()).unwrap()
}

pub fn condition_encoder() -> ConditionEncoder {
    ConditionEncoder::new(CONDITIONS.iter().map(|c| c.to_string()).collect()).unwrap()
}

pub fn predictor() -> VehiclePredictor {
    VehiclePredictor::new(
        Box::new(LinearPrice),
        Box::new(OdometerCondition),
        feature_encoders(),
        condition_encoder(),
    )
    .unwrap()
}

pub fn with_models(
    regressor: Box<dyn Regressor>,
    classifier: Box<dyn Classifier>,
) -> VehiclePredictor {
    VehiclePredictor::new(regressor, classifier, feature_encoders(), condition_encoder()).unwrap()
}

/// The documented example request for price prediction.
pub fn price_body() -> Value {
    json!({
        "year": 2015,
        "odometer": 50000,
        "lat": 33.749,
        "long": -84.388,
        "manufacturer": "toyota",
        "fuel": "gas",
        "title_status": "clean",
        "transmission": "automatic",
        "drive": "fwd",
        "size": "mid-size",
        "type": "sedan",
        "paint_color": "white",
        "state": "ca",
        "region": "los angeles",
        "condition": "good"
    })
}

/// The price example with `price` added and `condition` removed.
pub fn condition_body() -> Value {
    let mut body = price_body();
    let map = body.as_object_mut().unwrap();
    map.remove("condition");
    map.insert("price".to_string(), json!(15000));
    body
}

pub fn record(body: Value) -> FeatureRecord {
    FeatureRecord::from_value(body).unwrap()
}

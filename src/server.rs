//! HTTP surface over the predictor.
//!
//! Validates request bodies, forwards them to [`VehiclePredictor`] and maps
//! every outcome to a JSON response. Failures are always `{"error": ...}`.

use crate::error::{PredictionError, PredictionResult};
use crate::features::{
    required_fields, FeatureRecord, CONDITION_FEATURE_ORDER, PRICE_FEATURE_ORDER,
};
use crate::predictor::{ConditionPrediction, FeatureInfo, PricePrediction, VehiclePredictor};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared handler state: the predictor, or why it could not be loaded.
#[derive(Clone)]
pub struct AppState {
    predictor: Result<Arc<VehiclePredictor>, Arc<str>>,
}

impl AppState {
    pub fn ready(predictor: Arc<VehiclePredictor>) -> Self {
        Self {
            predictor: Ok(predictor),
        }
    }

    /// State for a service whose artifacts failed to load.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            predictor: Err(Arc::from(reason.into())),
        }
    }

    pub fn models_loaded(&self) -> bool {
        self.predictor.is_ok()
    }

    fn predictor(&self) -> Result<Arc<VehiclePredictor>, ApiError> {
        match &self.predictor {
            Ok(predictor) => Ok(Arc::clone(predictor)),
            Err(reason) => Err(ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Models not loaded: {reason}"),
            )),
        }
    }
}

/// Error response with a status code and a caller-facing message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn prediction_failed() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Prediction failed")
    }
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        if err.is_client_error() {
            return Self::bad_request(err.to_string());
        }
        match err {
            // Detail was logged where the failure happened
            PredictionError::ModelInvocation(_) => Self::prediction_failed(),
            _ => Self::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Successful prediction envelope, echoing the request.
#[derive(Debug, Serialize)]
pub struct PredictionResponse<T> {
    pub success: bool,
    pub prediction: T,
    pub input: FeatureRecord,
}

#[derive(Debug, Serialize)]
pub struct SupportedValues {
    pub success: bool,
    pub valid_categories: BTreeMap<String, Vec<String>>,
    pub feature_info: FeatureInfo,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root).fallback(method_not_allowed))
        .route("/health", get(health).fallback(method_not_allowed))
        .route(
            "/predict/price",
            post(predict_price).fallback(method_not_allowed),
        )
        .route(
            "/predict/condition",
            post(predict_condition).fallback(method_not_allowed),
        )
        .route(
            "/supported-values",
            get(supported_values).fallback(method_not_allowed),
        )
        .fallback(not_found)
        .with_state(state)
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "Vehicle Price and Condition Prediction API",
        "version": env!("CARGO_PKG_VERSION"),
        "models_loaded": state.models_loaded(),
        "endpoints": {
            "GET /": "API information",
            "GET /health": "Health check",
            "POST /predict/price": "Predict vehicle price",
            "POST /predict/condition": "Predict vehicle condition",
            "GET /supported-values": "Get supported categorical values"
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "models_loaded": state.models_loaded(),
    }))
}

async fn predict_price(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse<PricePrediction>>, ApiError> {
    let predictor = state.predictor()?;
    let record = parse_record(payload, &PRICE_FEATURE_ORDER)?;
    run_prediction(predictor, record, VehiclePredictor::predict_price).await
}

async fn predict_condition(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse<ConditionPrediction>>, ApiError> {
    let predictor = state.predictor()?;
    let record = parse_record(payload, &CONDITION_FEATURE_ORDER)?;
    run_prediction(predictor, record, VehiclePredictor::predict_condition).await
}

/// Run a prediction on the blocking pool; model sessions hold a lock while they run.
async fn run_prediction<T, F>(
    predictor: Arc<VehiclePredictor>,
    record: FeatureRecord,
    predict: F,
) -> Result<Json<PredictionResponse<T>>, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&VehiclePredictor, &FeatureRecord) -> PredictionResult<T> + Send + 'static,
{
    let (record, prediction) = tokio::task::spawn_blocking(move || {
        let prediction = predict(predictor.as_ref(), &record);
        (record, prediction)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "prediction task did not complete");
        ApiError::prediction_failed()
    })?;

    Ok(Json(PredictionResponse {
        success: true,
        prediction: prediction?,
        input: record,
    }))
}

async fn supported_values(
    State(state): State<AppState>,
) -> Result<Json<SupportedValues>, ApiError> {
    let predictor = state.predictor()?;
    Ok(Json(SupportedValues {
        success: true,
        valid_categories: predictor.valid_categories(),
        feature_info: predictor.feature_info(),
    }))
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Endpoint not found")
}

async fn method_not_allowed() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Turn a request body into a record holding every caller-supplied field of `order`.
fn parse_record(
    payload: Result<Json<Value>, JsonRejection>,
    order: &[&'static str],
) -> Result<FeatureRecord, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected request body");
        ApiError::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
    })?;

    let record = match body {
        Value::Null => return Err(ApiError::bad_request("No input data provided")),
        other => FeatureRecord::from_value(other)
            .ok_or_else(|| ApiError::bad_request("Request body must be a JSON object"))?,
    };
    if record.is_empty() {
        return Err(ApiError::bad_request("No input data provided"));
    }

    let missing = record.missing_fields(&required_fields(order));
    if !missing.is_empty() {
        return Err(PredictionError::MissingRequiredField { fields: missing }.into());
    }

    Ok(record)
}

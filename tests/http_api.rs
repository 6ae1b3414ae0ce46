//! HTTP surface tests against the axum router.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use vehicle_inference::{router, AppState};

fn app() -> Router {
    router(AppState::ready(Arc::new(common::predictor())))
}

fn unavailable_app() -> Router {
    router(AppState::unavailable(
        "Model artifact not found: models/regression_model.onnx",
    ))
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_root_and_health() {
    let (status, body) = send(app(), Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models_loaded"], json!(true));
    assert!(body["endpoints"]["POST /predict/price"].is_string());

    let (status, body) = send(app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy", "models_loaded": true}));
}

#[tokio::test]
async fn test_predict_price_success() {
    let (status, body) = send(
        app(),
        Method::POST,
        "/predict/price",
        Some(common::price_body()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["prediction"]["currency"], json!("USD"));
    assert_eq!(body["prediction"]["model_used"], json!("LinearPrice"));
    assert!(body["prediction"]["predicted_price"].is_f64());
    assert!(body["prediction"].get("encoding_warnings").is_none());
    assert_eq!(body["input"], common::price_body());
}

#[tokio::test]
async fn test_predict_price_reports_fallbacks() {
    let mut request = common::price_body();
    request["manufacturer"] = json!("not_a_real_brand");
    let (status, body) = send(app(), Method::POST, "/predict/price", Some(request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["prediction"]["encoding_warnings"],
        json!([{
            "feature": "manufacturer",
            "value": "not_a_real_brand",
            "substituted_code": 0
        }])
    );
}

#[tokio::test]
async fn test_predict_price_names_every_missing_field() {
    let mut request = common::price_body();
    let fields = request.as_object_mut().unwrap();
    fields.remove("year");
    fields.remove("lat");
    let (status, body) = send(app(), Method::POST, "/predict/price", Some(request)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Missing required fields: year, lat"));
}

#[tokio::test]
async fn test_predict_price_missing_layout_field() {
    let mut request = common::price_body();
    request.as_object_mut().unwrap().remove("region");
    let (status, body) = send(app(), Method::POST, "/predict/price", Some(request)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Missing required fields: region"));
}

#[tokio::test]
async fn test_predict_condition_success() {
    let (status, body) = send(
        app(),
        Method::POST,
        "/predict/condition",
        Some(common::condition_body()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let condition = body["prediction"]["predicted_condition"].as_str().unwrap();
    assert!(common::CONDITIONS.contains(&condition));

    let probabilities = body["prediction"]["probabilities"].as_object().unwrap();
    assert_eq!(probabilities.len(), common::CONDITIONS.len());
}

#[tokio::test]
async fn test_predict_condition_requires_price() {
    let (status, body) = send(
        app(),
        Method::POST,
        "/predict/condition",
        Some(common::price_body()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Missing required fields: price"));
}

#[tokio::test]
async fn test_bad_bodies_are_structured_errors() {
    let (status, body) = send(app(), Method::POST, "/predict/price", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("No input data provided"));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict/price")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
}

#[tokio::test]
async fn test_invalid_numeric_value() {
    let mut request = common::price_body();
    request["year"] = json!("last year");
    let (status, body) = send(app(), Method::POST, "/predict/price", Some(request)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("year"));
}

#[tokio::test]
async fn test_model_failure_hides_detail() {
    let predictor = common::with_models(
        Box::new(common::Failing),
        Box::new(common::LabelOnly(0)),
    );
    let app = router(AppState::ready(Arc::new(predictor)));
    let (status, body) = send(app, Method::POST, "/predict/price", Some(common::price_body())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Prediction failed"}));
}

#[tokio::test]
async fn test_supported_values() {
    let (status, body) = send(app(), Method::GET, "/supported-values", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["valid_categories"]["condition"],
        json!(common::CONDITIONS)
    );
    assert_eq!(body["valid_categories"]["fuel"][0], json!("diesel"));
    assert_eq!(body["feature_info"]["current_year"], json!(2021));
    assert_eq!(
        body["feature_info"]["classification_features"]["required"][0],
        json!("price")
    );
}

#[tokio::test]
async fn test_unavailable_service() {
    let (status, body) = send(unavailable_app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models_loaded"], json!(false));

    let (status, body) = send(
        unavailable_app(),
        Method::POST,
        "/predict/price",
        Some(common::price_body()),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Models not loaded"));

    let (status, _) = send(unavailable_app(), Method::GET, "/supported-values", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let (status, body) = send(app(), Method::GET, "/predict/mileage", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Endpoint not found"}));

    let (status, body) = send(app(), Method::GET, "/predict/price", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({"error": "Method not allowed"}));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_predictions() {
    let app = app();
    let requests: Vec<_> = (0..16)
        .map(|i| {
            let app = app.clone();
            let (uri, body) = if i % 2 == 0 {
                ("/predict/price", common::price_body())
            } else {
                ("/predict/condition", common::condition_body())
            };
            tokio::spawn(async move { send(app, Method::POST, uri, Some(body)).await })
        })
        .collect();

    for request in requests {
        let (status, body) = request.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
    }
}

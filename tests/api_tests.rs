/// HTTP routing tests
/// Exercises handlers that answer before touching the database; the pool is
/// lazily connected and never used.
mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{golden_record, FixedProbability};
use loan_risk_api::config::Config;
use loan_risk_api::handlers::{app_router, AppState};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower::ServiceExt;

/// Helper function to create test config
fn create_test_config() -> Config {
    Config {
        database_url: "postgresql://test@localhost:1/unused".to_string(),
        port: 8080,
        model_path: "xgb_model.json".into(),
        model_sha256: None,
        model_base_score: 0.5,
        data_dir: ".".into(),
        load_csv_on_start: false,
        reset_predictions_on_start: false,
    }
}

fn test_app() -> axum::Router {
    let config = create_test_config();
    let db = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("lazy pool");
    app_router(Arc::new(AppState {
        db,
        classifier: Arc::new(FixedProbability(0.55)),
    }))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = test_app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "loan-risk-api");
}

#[tokio::test]
async fn test_zero_total_accounts_is_bad_request() {
    let mut record = golden_record();
    record.total_accounts = 0;

    let response = test_app()
        .oneshot(post_json(
            "/api/v1/predictions",
            serde_json::to_value(&record).unwrap(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("total_accounts"));
}

#[tokio::test]
async fn test_legacy_payload_is_bad_request() {
    let mut payload = serde_json::to_value(golden_record()).unwrap();
    let obj = payload.as_object_mut().unwrap();
    obj.remove("gender");
    obj.remove("marital_status");

    let response = test_app()
        .oneshot(post_json("/api/v1/predictions", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "gender is required");
}

#[tokio::test]
async fn test_unknown_marital_status_is_bad_request() {
    let mut record = golden_record();
    record.marital_status = Some("Widowed".to_string());

    let response = test_app()
        .oneshot(post_json(
            "/api/v1/predictions",
            serde_json::to_value(&record).unwrap(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_client_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/predictions")
        .header("content-type", "application/json")
        .body(Body::from("{\"age\": \"thirty\"}"))
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_malformed_customer_id_is_bad_request() {
    let response = test_app()
        .oneshot(
            Request::get("/api/v1/customers/C0456.bak")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = test_app()
        .oneshot(post_json(
            "/api/v1/customers/C0456.bak/predictions",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_positive_limit_is_bad_request() {
    let response = test_app()
        .oneshot(
            Request::get("/api/v1/predictions?limit=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let response = test_app()
        .oneshot(
            Request::get("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let paths = body["paths"].as_object().unwrap();
    assert!(paths.contains_key("/api/v1/predictions"));
    assert!(paths.contains_key("/api/v1/customers/{customer_id}/predictions"));
}

use crate::classifier::Classifier;
use crate::db_storage::PredictionStorage;
use crate::errors::{AppError, InvalidInputError};
use crate::models::*;
use crate::prediction;
use crate::scoring::RiskCategory;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 500;

/// Shared application state injected into handlers.
///
/// Built once at startup and never mutated; the classifier is loaded a
/// single time and shared read-only by every request.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Loaded default-risk classifier.
    pub classifier: Arc<dyn Classifier>,
}

/// OpenAPI document for the scoring API.
#[derive(OpenApi)]
#[openapi(
    paths(health, create_prediction, list_predictions, get_customer, score_customer),
    components(schemas(
        LoanApplicationRecord,
        PredictionResponse,
        PredictionSource,
        FeatureBreakdown,
        StoredPrediction,
        RiskCategory
    )),
    tags((name = "loan-risk", description = "Loan default risk scoring"))
)]
pub struct ApiDoc;

/// Scoring, lookup and documentation routes (everything except `/health`).
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/predictions",
            post(create_prediction).get(list_predictions),
        )
        .route("/api/v1/customers/:customer_id", get(get_customer))
        .route(
            "/api/v1/customers/:customer_id/predictions",
            post(score_customer),
        )
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// Full application router without transport middleware.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(api_routes())
        .with_state(state)
}

/// Health check endpoint.
///
/// Returns the service status and version.
#[utoipa::path(
    get,
    path = "/health",
    tag = "loan-risk",
    responses((status = 200, description = "Service is healthy"))
)]
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "loan-risk-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/predictions
///
/// Scores a manually entered application and appends it to the history.
#[utoipa::path(
    post,
    path = "/api/v1/predictions",
    tag = "loan-risk",
    request_body = LoanApplicationRecord,
    responses(
        (status = 201, description = "Application scored", body = PredictionResponse),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_prediction(
    State(state): State<Arc<AppState>>,
    Json(record): Json<LoanApplicationRecord>,
) -> Result<(StatusCode, Json<PredictionResponse>), AppError> {
    tracing::info!("POST /predictions - manual entry");

    let response =
        prediction::assess_and_record(&state, &record, PredictionSource::Manual, None).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/predictions
///
/// Lists past predictions, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/predictions",
    tag = "loan-risk",
    params(PredictionListParams),
    responses(
        (status = 200, description = "Past predictions", body = [StoredPrediction]),
        (status = 400, description = "Invalid limit")
    )
)]
pub async fn list_predictions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PredictionListParams>,
) -> Result<Json<Vec<StoredPrediction>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit < 1 {
        return Err(InvalidInputError::OutOfRange {
            field: "limit",
            value: limit as f64,
        }
        .into());
    }

    let storage = PredictionStorage::new(state.db.clone());
    let rows = storage.list_predictions(limit.min(MAX_LIST_LIMIT)).await?;

    tracing::debug!("Returning {} past predictions", rows.len());
    Ok(Json(rows))
}

/// GET /api/v1/customers/:customer_id
///
/// Returns the joined customer/loan/credit record without scoring it.
#[utoipa::path(
    get,
    path = "/api/v1/customers/{customer_id}",
    tag = "loan-risk",
    params(("customer_id" = String, Path, description = "Customer identifier, e.g. C0456")),
    responses(
        (status = 200, description = "Customer record", body = LoanApplicationRecord),
        (status = 400, description = "Malformed customer id"),
        (status = 404, description = "Customer not found")
    )
)]
pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
) -> Result<Json<LoanApplicationRecord>, AppError> {
    tracing::info!("GET /customers/{}", customer_id);
    prediction::validate_customer_id(&customer_id)?;

    let storage = PredictionStorage::new(state.db.clone());
    let record = storage
        .query_customer(&customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer ID {} not found", customer_id)))?;

    Ok(Json(record))
}

/// POST /api/v1/customers/:customer_id/predictions
///
/// Looks up a stored customer, scores it and appends the result.
#[utoipa::path(
    post,
    path = "/api/v1/customers/{customer_id}/predictions",
    tag = "loan-risk",
    params(("customer_id" = String, Path, description = "Customer identifier, e.g. C0456")),
    responses(
        (status = 201, description = "Customer scored", body = PredictionResponse),
        (status = 400, description = "Malformed id or incomplete customer record"),
        (status = 404, description = "Customer not found")
    )
)]
pub async fn score_customer(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
) -> Result<(StatusCode, Json<PredictionResponse>), AppError> {
    tracing::info!("POST /customers/{}/predictions", customer_id);

    let response = prediction::assess_customer(&state, &customer_id).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

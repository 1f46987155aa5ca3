//! Shared scoring workflow for the HTTP handlers
//!
//! 1. Validate and derive features
//! 2. Score with the loaded classifier
//! 3. Append the result to the prediction history

use regex::Regex;
use std::sync::OnceLock;

use crate::classifier::Classifier;
use crate::db_storage::{NewPrediction, PredictionStorage};
use crate::errors::{AppError, InvalidInputError};
use crate::features::{FeatureBuilder, FeatureVector};
use crate::handlers::AppState;
use crate::models::{FeatureBreakdown, LoanApplicationRecord, PredictionResponse, PredictionSource};
use crate::scoring::{RiskScorer, ScoringResult};

/// Features and score for one application, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub features: FeatureVector,
    pub result: ScoringResult,
}

/// Builds features and scores them. Pure; nothing is stored.
pub fn assess(
    record: &LoanApplicationRecord,
    classifier: &dyn Classifier,
) -> Result<RiskAssessment, AppError> {
    let features = FeatureBuilder::build(record)?;
    let result = RiskScorer::score(&features, classifier)?;
    Ok(RiskAssessment { features, result })
}

/// Checks a customer id before it reaches a query.
pub fn validate_customer_id(customer_id: &str) -> Result<(), InvalidInputError> {
    static CUSTOMER_ID_RE: OnceLock<Regex> = OnceLock::new();
    let re = CUSTOMER_ID_RE
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid customer id regex"));

    if re.is_match(customer_id) {
        Ok(())
    } else {
        Err(InvalidInputError::Malformed {
            field: "customer_id",
            reason: "expected 1-64 letters, digits, '-' or '_'".to_string(),
        })
    }
}

/// Scores a record and appends it to the history table.
pub async fn assess_and_record(
    state: &AppState,
    record: &LoanApplicationRecord,
    source: PredictionSource,
    customer_id: Option<&str>,
) -> Result<PredictionResponse, AppError> {
    let assessment = assess(record, state.classifier.as_ref())?;

    tracing::info!(
        "Risk Score: {} → Category: {} (source: {}, customer: {:?})",
        assessment.result.risk_score,
        assessment.result.risk_category,
        source.as_str(),
        customer_id
    );

    let storage = PredictionStorage::new(state.db.clone());
    let (id, created_at) = storage
        .append_prediction(&NewPrediction {
            customer_id,
            source,
            record,
            features: &assessment.features,
            result: &assessment.result,
        })
        .await?;

    Ok(PredictionResponse {
        id,
        customer_id: customer_id.map(str::to_string),
        source,
        risk_score: assessment.result.risk_score,
        risk_category: assessment.result.risk_category,
        features: FeatureBreakdown::from(&assessment.features),
        created_at,
    })
}

/// Looks up a customer's joined record and scores it.
pub async fn assess_customer(
    state: &AppState,
    customer_id: &str,
) -> Result<PredictionResponse, AppError> {
    validate_customer_id(customer_id)?;

    let storage = PredictionStorage::new(state.db.clone());
    let record = storage
        .query_customer(customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer ID {} not found", customer_id)))?;

    tracing::info!("✓ Customer data loaded for {}", customer_id);
    assess_and_record(state, &record, PredictionSource::CustomerLookup, Some(customer_id)).await
}

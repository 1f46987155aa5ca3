use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::features::FeatureVector;
use crate::scoring::RiskCategory;

// ============ Domain Models ============

/// Raw customer and loan attributes submitted for scoring.
///
/// Populated either from manual entry or from the customers/loans/credits
/// join. `gender` and `marital_status` are optional only so that legacy
/// records without them deserialize; the feature builder rejects them.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct LoanApplicationRecord {
    /// Applicant age in years.
    #[schema(example = 35)]
    pub age: i64,
    /// Annual income, must be positive.
    #[schema(example = 50000.0)]
    pub annual_income: f64,
    /// Credit bureau score (300-850).
    #[schema(example = 700)]
    pub credit_score: i64,
    /// Number of recent credit inquiries.
    pub num_inquiries: i64,
    /// Currently open credit lines.
    pub open_credit_lines: i64,
    /// Total credit accounts, must be positive.
    pub total_accounts: i64,
    /// Accounts currently delinquent.
    pub delinquent_accounts: i64,
    /// Requested loan amount.
    #[schema(example = 15000.0)]
    pub loan_amount: f64,
    /// Loan term in months (12, 24, 36, 60, 120 or 180).
    #[schema(example = 36)]
    pub loan_term_months: i64,
    /// "Male" or "Female".
    #[schema(example = "Male")]
    pub gender: Option<String>,
    /// "Married" or "Single".
    #[schema(example = "Single")]
    pub marital_status: Option<String>,
}

/// Where the scored record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    /// Submitted directly by the caller.
    Manual,
    /// Read from the customers/loans/credits tables.
    CustomerLookup,
}

impl PredictionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionSource::Manual => "manual",
            PredictionSource::CustomerLookup => "customer_lookup",
        }
    }
}

/// Named view of a feature vector, as returned to API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeatureBreakdown {
    pub age: f64,
    pub annual_income: f64,
    pub credit_score: f64,
    pub num_inquiries: f64,
    pub open_credit_lines: f64,
    pub total_accounts: f64,
    pub delinquent_accounts: f64,
    pub debt_to_income: f64,
    pub credit_utilization: f64,
    pub payment_ratio: f64,
    pub loan_age_months: f64,
    pub gender_encoded: f64,
    pub marital_status_encoded: f64,
}

impl From<&FeatureVector> for FeatureBreakdown {
    fn from(v: &FeatureVector) -> Self {
        let [
            age,
            annual_income,
            credit_score,
            num_inquiries,
            open_credit_lines,
            total_accounts,
            delinquent_accounts,
            debt_to_income,
            credit_utilization,
            payment_ratio,
            loan_age_months,
            gender_encoded,
            marital_status_encoded,
        ] = *v.values();
        Self {
            age,
            annual_income,
            credit_score,
            num_inquiries,
            open_credit_lines,
            total_accounts,
            delinquent_accounts,
            debt_to_income,
            credit_utilization,
            payment_ratio,
            loan_age_months,
            gender_encoded,
            marital_status_encoded,
        }
    }
}

// ============ Database Models ============

/// A row of the `loan_predictions` history table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct StoredPrediction {
    /// Unique identifier for the prediction.
    pub id: Uuid,
    /// Customer id when the record came from a lookup.
    pub customer_id: Option<String>,
    /// "manual" or "customer_lookup".
    pub source: String,
    pub age: i64,
    pub annual_income: f64,
    pub credit_score: i64,
    pub num_inquiries: i64,
    pub open_credit_lines: i64,
    pub total_accounts: i64,
    pub delinquent_accounts: i64,
    pub loan_amount: f64,
    pub loan_term_months: i64,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub debt_to_income: f64,
    pub credit_utilization: f64,
    pub payment_ratio: f64,
    pub loan_age_months: i64,
    pub gender_encoded: i64,
    pub marital_status_encoded: i64,
    /// Risk score (0-100) produced for this record.
    pub prediction: f64,
    /// "Low", "Medium" or "High".
    pub risk_category: String,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
}

// ============ API Models ============

/// Response body for a scored application.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PredictionResponse {
    /// Id of the appended history row.
    pub id: Uuid,
    pub customer_id: Option<String>,
    pub source: PredictionSource,
    /// Probability of default scaled to 0-100, two decimals.
    pub risk_score: f64,
    pub risk_category: RiskCategory,
    /// Features the classifier was invoked with.
    pub features: FeatureBreakdown,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for listing past predictions.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PredictionListParams {
    /// Maximum number of rows to return (default 50, max 500).
    pub limit: Option<i64>,
}

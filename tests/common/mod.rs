//! Shared fixtures for integration tests.
#![allow(dead_code)]

use loan_risk_api::classifier::Classifier;
use loan_risk_api::errors::ClassifierError;
use loan_risk_api::features::FeatureVector;
use loan_risk_api::models::LoanApplicationRecord;
use serde_json::json;

/// The reference application used across tests.
pub fn golden_record() -> LoanApplicationRecord {
    LoanApplicationRecord {
        age: 35,
        annual_income: 50000.0,
        credit_score: 700,
        num_inquiries: 2,
        open_credit_lines: 4,
        total_accounts: 10,
        delinquent_accounts: 0,
        loan_amount: 15000.0,
        loan_term_months: 36,
        gender: Some("Male".to_string()),
        marital_status: Some("Single".to_string()),
    }
}

/// Classifier stub that always returns the same probability.
pub struct FixedProbability(pub f64);

impl Classifier for FixedProbability {
    fn predict_probability(&self, _features: &FeatureVector) -> Result<f64, ClassifierError> {
        Ok(self.0)
    }
}

/// Classifier stub that always fails.
pub struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn predict_probability(&self, _features: &FeatureVector) -> Result<f64, ClassifierError> {
        Err(ClassifierError::Evaluation("stub failure".to_string()))
    }
}

/// Two-stump XGBoost JSON dump (base_score 0.5):
/// - credit_score < 600 → +0.8, else -0.4
/// - debt_to_income < 0.5 → -0.2, else +0.6
///
/// The first tree names its feature positionally, the second by name.
pub fn stump_model() -> serde_json::Value {
    json!([
        stump(FEATURE_POSITION_CREDIT, 600.0, 0.8, -0.4),
        stump("debt_to_income", 0.5, -0.2, 0.6)
    ])
}

const FEATURE_POSITION_CREDIT: &str = "f2";

/// One split with two leaves, in XGBoost's dump layout.
pub fn stump(split: &str, condition: f64, yes: f64, no: f64) -> serde_json::Value {
    json!({
        "nodeid": 0,
        "depth": 0,
        "split": split,
        "split_condition": condition,
        "yes": 1,
        "no": 2,
        "missing": 1,
        "children": [
            {"nodeid": 1, "leaf": yes},
            {"nodeid": 2, "leaf": no}
        ]
    })
}

pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

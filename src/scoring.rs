use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::classifier::Classifier;
use crate::errors::ClassifierError;
use crate::features::FeatureVector;

/// Scores at or above this are High risk.
pub const HIGH_RISK_THRESHOLD: f64 = 70.0;
/// Scores at or above this (and below High) are Medium risk.
pub const MEDIUM_RISK_THRESHOLD: f64 = 40.0;

/// Three-level bucketing of the risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    /// Maps a 0-100 risk score to its category. Lower bounds are inclusive.
    pub fn from_score(risk_score: f64) -> Self {
        if risk_score >= HIGH_RISK_THRESHOLD {
            RiskCategory::High
        } else if risk_score >= MEDIUM_RISK_THRESHOLD {
            RiskCategory::Medium
        } else {
            RiskCategory::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::High => "High",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of scoring one application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScoringResult {
    /// Probability of default × 100, rounded to two decimals.
    pub risk_score: f64,
    pub risk_category: RiskCategory,
}

/// Runs the classifier and buckets its output.
pub struct RiskScorer;

impl RiskScorer {
    /// Scores `features` with `classifier`.
    ///
    /// Classifier failures and probabilities outside `[0, 1]` are returned as
    /// [`ClassifierError`]; nothing is retried.
    pub fn score(
        features: &FeatureVector,
        classifier: &dyn Classifier,
    ) -> Result<ScoringResult, ClassifierError> {
        let probability = classifier.predict_probability(features)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(ClassifierError::InvalidProbability(probability));
        }

        let risk_score = round_to_cents(probability * 100.0);
        Ok(ScoringResult {
            risk_score,
            risk_category: RiskCategory::from_score(risk_score),
        })
    }
}

/// Rounds to two decimals from the exact binary value, so 0.01499.. stays
/// 0.01 instead of being pushed over the tie by an extra multiplication.
fn round_to_cents(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_cents() {
        assert_eq!(round_to_cents(55.000000000000014), 55.0);
        assert_eq!(round_to_cents(12.345678), 12.35);
        assert_eq!(round_to_cents(0.0), 0.0);
        assert_eq!(round_to_cents(100.0), 100.0);
        assert_eq!(round_to_cents(0.00015 * 100.0), 0.01);
        assert_eq!(round_to_cents(2.675), 2.67);
    }

    #[test]
    fn test_category_serializes_as_name() {
        assert_eq!(
            serde_json::to_string(&RiskCategory::Medium).unwrap(),
            "\"Medium\""
        );
        assert_eq!(RiskCategory::High.to_string(), "High");
    }
}

//! Feature derivation for the default-risk classifier.
//!
//! The classifier was trained on a fixed column order; [`FEATURE_NAMES`] is
//! that order and [`FeatureBuilder::build`] is the only place vectors are
//! assembled.

use crate::errors::InvalidInputError;
use crate::models::LoanApplicationRecord;

/// Number of features the classifier expects.
pub const FEATURE_COUNT: usize = 13;

/// Column order the classifier was trained on.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "annual_income",
    "credit_score",
    "num_inquiries",
    "open_credit_lines",
    "total_accounts",
    "delinquent_accounts",
    "debt_to_income",
    "credit_utilization",
    "payment_ratio",
    "loan_age_months",
    "gender_encoded",
    "marital_status_encoded",
];

/// Placeholder until repayment history is available per application.
pub const PAYMENT_RATIO_PLACEHOLDER: f64 = 0.85;

/// Placeholder loan age for new applications.
pub const LOAN_AGE_MONTHS_PLACEHOLDER: i64 = 12;

/// Loan terms offered, in months.
pub const LOAN_TERMS_MONTHS: [i64; 6] = [12, 24, 36, 60, 120, 180];

pub const MIN_CREDIT_SCORE: i64 = 300;
pub const MAX_CREDIT_SCORE: i64 = 850;

const DEBT_TO_INCOME_IDX: usize = 7;
const CREDIT_UTILIZATION_IDX: usize = 8;
const PAYMENT_RATIO_IDX: usize = 9;
const LOAN_AGE_MONTHS_IDX: usize = 10;
const GENDER_IDX: usize = 11;
const MARITAL_STATUS_IDX: usize = 12;

/// Ordered numeric input for the classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Looks up a feature by its column name.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.values[idx])
    }

    pub fn debt_to_income(&self) -> f64 {
        self.values[DEBT_TO_INCOME_IDX]
    }

    pub fn credit_utilization(&self) -> f64 {
        self.values[CREDIT_UTILIZATION_IDX]
    }

    pub fn payment_ratio(&self) -> f64 {
        self.values[PAYMENT_RATIO_IDX]
    }

    pub fn loan_age_months(&self) -> f64 {
        self.values[LOAN_AGE_MONTHS_IDX]
    }

    pub fn gender_encoded(&self) -> f64 {
        self.values[GENDER_IDX]
    }

    pub fn marital_status_encoded(&self) -> f64 {
        self.values[MARITAL_STATUS_IDX]
    }
}

/// Turns raw application fields into the classifier's feature vector.
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Validates `raw` and derives the 13-element feature vector.
    ///
    /// Fails with [`InvalidInputError`] when a denominator is zero, a numeric
    /// field is out of range, or a categorical field is missing or unknown.
    pub fn build(raw: &LoanApplicationRecord) -> Result<FeatureVector, InvalidInputError> {
        if raw.annual_income == 0.0 {
            return Err(InvalidInputError::ZeroDenominator {
                field: "annual_income",
            });
        }
        require_positive("annual_income", raw.annual_income)?;

        if raw.total_accounts == 0 {
            return Err(InvalidInputError::ZeroDenominator {
                field: "total_accounts",
            });
        }
        require_non_negative_count("total_accounts", raw.total_accounts)?;

        if !raw.loan_amount.is_finite() || raw.loan_amount < 0.0 {
            return Err(InvalidInputError::OutOfRange {
                field: "loan_amount",
                value: raw.loan_amount,
            });
        }
        if raw.age <= 0 {
            return Err(InvalidInputError::OutOfRange {
                field: "age",
                value: raw.age as f64,
            });
        }
        if !(MIN_CREDIT_SCORE..=MAX_CREDIT_SCORE).contains(&raw.credit_score) {
            return Err(InvalidInputError::OutOfRange {
                field: "credit_score",
                value: raw.credit_score as f64,
            });
        }
        require_non_negative_count("num_inquiries", raw.num_inquiries)?;
        require_non_negative_count("open_credit_lines", raw.open_credit_lines)?;
        require_non_negative_count("delinquent_accounts", raw.delinquent_accounts)?;
        if !LOAN_TERMS_MONTHS.contains(&raw.loan_term_months) {
            return Err(InvalidInputError::OutOfRange {
                field: "loan_term_months",
                value: raw.loan_term_months as f64,
            });
        }

        let gender_encoded = encode_gender(raw.gender.as_deref())?;
        let marital_status_encoded = encode_marital_status(raw.marital_status.as_deref())?;

        let debt_to_income = raw.loan_amount / raw.annual_income;
        let credit_utilization = raw.open_credit_lines as f64 / raw.total_accounts as f64;

        Ok(FeatureVector {
            values: [
                raw.age as f64,
                raw.annual_income,
                raw.credit_score as f64,
                raw.num_inquiries as f64,
                raw.open_credit_lines as f64,
                raw.total_accounts as f64,
                raw.delinquent_accounts as f64,
                debt_to_income,
                credit_utilization,
                PAYMENT_RATIO_PLACEHOLDER,
                LOAN_AGE_MONTHS_PLACEHOLDER as f64,
                gender_encoded,
                marital_status_encoded,
            ],
        })
    }
}

/// "Male" → 1, "Female" → 0. Anything else is rejected.
pub fn encode_gender(value: Option<&str>) -> Result<f64, InvalidInputError> {
    match value {
        Some("Male") => Ok(1.0),
        Some("Female") => Ok(0.0),
        Some(other) => Err(InvalidInputError::UnrecognizedCategory {
            field: "gender",
            value: other.to_string(),
        }),
        None => Err(InvalidInputError::MissingField { field: "gender" }),
    }
}

/// "Married" → 1, "Single" → 0. Anything else is rejected.
pub fn encode_marital_status(value: Option<&str>) -> Result<f64, InvalidInputError> {
    match value {
        Some("Married") => Ok(1.0),
        Some("Single") => Ok(0.0),
        Some(other) => Err(InvalidInputError::UnrecognizedCategory {
            field: "marital_status",
            value: other.to_string(),
        }),
        None => Err(InvalidInputError::MissingField {
            field: "marital_status",
        }),
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), InvalidInputError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(InvalidInputError::OutOfRange { field, value })
    }
}

fn require_non_negative_count(field: &'static str, value: i64) -> Result<(), InvalidInputError> {
    if value < 0 {
        return Err(InvalidInputError::OutOfRange {
            field,
            value: value as f64,
        });
    }
    Ok(())
}

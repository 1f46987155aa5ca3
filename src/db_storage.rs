use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::{AppError, ResultExt};
use crate::features::FeatureVector;
use crate::models::{LoanApplicationRecord, PredictionSource, StoredPrediction};
use crate::scoring::ScoringResult;

const CREATE_PREDICTIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS loan_predictions (
        id UUID PRIMARY KEY,
        customer_id TEXT,
        source TEXT NOT NULL,
        age BIGINT NOT NULL,
        annual_income DOUBLE PRECISION NOT NULL,
        credit_score BIGINT NOT NULL,
        num_inquiries BIGINT NOT NULL,
        open_credit_lines BIGINT NOT NULL,
        total_accounts BIGINT NOT NULL,
        delinquent_accounts BIGINT NOT NULL,
        loan_amount DOUBLE PRECISION NOT NULL,
        loan_term_months BIGINT NOT NULL,
        gender TEXT,
        marital_status TEXT,
        debt_to_income DOUBLE PRECISION NOT NULL,
        credit_utilization DOUBLE PRECISION NOT NULL,
        payment_ratio DOUBLE PRECISION NOT NULL,
        loan_age_months BIGINT NOT NULL,
        gender_encoded BIGINT NOT NULL,
        marital_status_encoded BIGINT NOT NULL,
        prediction DOUBLE PRECISION NOT NULL,
        risk_category TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

/// A scored application ready to be appended to the history table.
#[derive(Debug, Clone, Copy)]
pub struct NewPrediction<'a> {
    pub customer_id: Option<&'a str>,
    pub source: PredictionSource,
    pub record: &'a LoanApplicationRecord,
    pub features: &'a FeatureVector,
    pub result: &'a ScoringResult,
}

/// Database storage for customer lookups and the prediction history.
pub struct PredictionStorage {
    pool: PgPool,
}

impl PredictionStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `loan_predictions` table, dropping it first when `reset`.
    pub async fn init_schema(&self, reset: bool) -> Result<(), AppError> {
        if reset {
            tracing::warn!("Dropping prediction history (reset requested)");
            sqlx::query("DROP TABLE IF EXISTS loan_predictions")
                .execute(&self.pool)
                .await
                .context("drop loan_predictions")?;
        }

        sqlx::query(CREATE_PREDICTIONS_TABLE)
            .execute(&self.pool)
            .await
            .context("create loan_predictions")?;

        tracing::info!("✓ loan_predictions table ready");
        Ok(())
    }

    /// Appends one scored application. Rows are never updated afterwards.
    pub async fn append_prediction(
        &self,
        prediction: &NewPrediction<'_>,
    ) -> Result<(Uuid, DateTime<Utc>), AppError> {
        let id = Uuid::new_v4();
        let record = prediction.record;
        let features = prediction.features;

        let (id, created_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO loan_predictions (
                id, customer_id, source,
                age, annual_income, credit_score, num_inquiries, open_credit_lines,
                total_accounts, delinquent_accounts, loan_amount, loan_term_months,
                gender, marital_status,
                debt_to_income, credit_utilization, payment_ratio, loan_age_months,
                gender_encoded, marital_status_encoded,
                prediction, risk_category
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22)
            RETURNING id, created_at
            "#,
        )
        .bind(id)
        .bind(prediction.customer_id)
        .bind(prediction.source.as_str())
        .bind(record.age)
        .bind(record.annual_income)
        .bind(record.credit_score)
        .bind(record.num_inquiries)
        .bind(record.open_credit_lines)
        .bind(record.total_accounts)
        .bind(record.delinquent_accounts)
        .bind(record.loan_amount)
        .bind(record.loan_term_months)
        .bind(record.gender.as_deref())
        .bind(record.marital_status.as_deref())
        .bind(features.debt_to_income())
        .bind(features.credit_utilization())
        .bind(features.payment_ratio())
        .bind(features.loan_age_months() as i64)
        .bind(features.gender_encoded() as i64)
        .bind(features.marital_status_encoded() as i64)
        .bind(prediction.result.risk_score)
        .bind(prediction.result.risk_category.as_str())
        .fetch_one(&self.pool)
        .await
        .context("append prediction")?;

        tracing::debug!("Appended prediction {} ({})", id, prediction.source.as_str());
        Ok((id, created_at))
    }

    /// Joins customers, loans and credits for one customer id.
    ///
    /// `Ok(None)` means the id has no complete joined record; database
    /// failures are returned as errors.
    pub async fn query_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<LoanApplicationRecord>, AppError> {
        let record = sqlx::query_as::<_, LoanApplicationRecord>(
            r#"
            SELECT c.age, c.annual_income, cr.credit_score, cr.num_inquiries,
                   cr.open_credit_lines, cr.total_accounts, cr.delinquent_accounts,
                   l.loan_amount, l.loan_term_months, c.gender, c.marital_status
            FROM customers c
            JOIN loans l ON c.customer_id = l.customer_id
            JOIN credits cr ON c.customer_id = cr.customer_id
            WHERE c.customer_id = $1
            LIMIT 1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("lookup customer {}", customer_id))?;

        Ok(record)
    }

    /// Past predictions, newest first.
    pub async fn list_predictions(&self, limit: i64) -> Result<Vec<StoredPrediction>, AppError> {
        let rows = sqlx::query_as::<_, StoredPrediction>(
            "SELECT * FROM loan_predictions ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("list predictions")?;

        Ok(rows)
    }
}

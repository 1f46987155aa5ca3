//! Bulk load of the source CSV extracts into PostgreSQL.
//!
//! Every load replaces the target table. The three relations joined for
//! customer lookups are typed; the remaining extracts are stored as text
//! columns named after the CSV header.

use anyhow::{Context, Result};
use csv::Reader;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::postgres::Postgres;
use sqlx::query_builder::Separated;
use sqlx::{PgPool, QueryBuilder};
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use std::sync::OnceLock;

pub const CUSTOMERS_CSV: &str = "customer_profile_large.csv";
pub const LOANS_CSV: &str = "loan_history_large.csv";
pub const REPAYMENTS_CSV: &str = "repayment_records_cleaned.csv";
pub const CREDITS_CSV: &str = "credit_score_large.csv";
pub const ECONOMIC_INDICATORS_CSV: &str = "economic_indicators_large.csv";

/// Rows per INSERT statement for typed tables.
const BATCH_ROWS: usize = 1000;
/// PostgreSQL caps bind parameters per statement at 65535.
const MAX_BIND_PARAMS: usize = 65_535;

/// A CSV extract with a fixed table layout.
pub trait CsvTable: DeserializeOwned + Send + Sync {
    const TABLE: &'static str;
    const CREATE_SQL: &'static str;
    const COLUMNS: &'static str;

    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>);
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomerCsvRow {
    pub customer_id: String,
    pub age: i64,
    pub annual_income: f64,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
}

impl CsvTable for CustomerCsvRow {
    const TABLE: &'static str = "customers";
    const CREATE_SQL: &'static str = r#"
        CREATE TABLE customers (
            customer_id TEXT NOT NULL,
            age BIGINT NOT NULL,
            annual_income DOUBLE PRECISION NOT NULL,
            gender TEXT,
            marital_status TEXT
        )
    "#;
    const COLUMNS: &'static str = "customer_id, age, annual_income, gender, marital_status";

    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.customer_id.clone())
            .push_bind(self.age)
            .push_bind(self.annual_income)
            .push_bind(self.gender.clone())
            .push_bind(self.marital_status.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoanCsvRow {
    pub customer_id: String,
    pub loan_amount: f64,
    pub loan_term_months: i64,
}

impl CsvTable for LoanCsvRow {
    const TABLE: &'static str = "loans";
    const CREATE_SQL: &'static str = r#"
        CREATE TABLE loans (
            customer_id TEXT NOT NULL,
            loan_amount DOUBLE PRECISION NOT NULL,
            loan_term_months BIGINT NOT NULL
        )
    "#;
    const COLUMNS: &'static str = "customer_id, loan_amount, loan_term_months";

    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.customer_id.clone())
            .push_bind(self.loan_amount)
            .push_bind(self.loan_term_months);
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreditCsvRow {
    pub customer_id: String,
    pub credit_score: i64,
    pub num_inquiries: i64,
    pub open_credit_lines: i64,
    pub total_accounts: i64,
    pub delinquent_accounts: i64,
}

impl CsvTable for CreditCsvRow {
    const TABLE: &'static str = "credits";
    const CREATE_SQL: &'static str = r#"
        CREATE TABLE credits (
            customer_id TEXT NOT NULL,
            credit_score BIGINT NOT NULL,
            num_inquiries BIGINT NOT NULL,
            open_credit_lines BIGINT NOT NULL,
            total_accounts BIGINT NOT NULL,
            delinquent_accounts BIGINT NOT NULL
        )
    "#;
    const COLUMNS: &'static str =
        "customer_id, credit_score, num_inquiries, open_credit_lines, total_accounts, delinquent_accounts";

    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.customer_id.clone())
            .push_bind(self.credit_score)
            .push_bind(self.num_inquiries)
            .push_bind(self.open_credit_lines)
            .push_bind(self.total_accounts)
            .push_bind(self.delinquent_accounts);
    }
}

/// Untyped CSV contents: lowercased header plus rows of optional text.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Row counts per table after a load.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub customers: usize,
    pub loans: usize,
    pub credits: usize,
    pub repayments: usize,
    pub economic_indicators: usize,
}

/// Whether `name` can be used unquoted as a column or table name.
pub fn is_sql_identifier(name: &str) -> bool {
    static IDENT_RE: OnceLock<Regex> = OnceLock::new();
    IDENT_RE
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid identifier regex"))
        .is_match(name)
}

/// Double-quotes `name` so reserved words (`order`, `user`, ...) stay usable.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Deserializes every row of a headed CSV file.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;

    let mut reader = Reader::from_reader(file);
    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize().enumerate() {
        // Header is line 1
        let row: T =
            result.with_context(|| format!("{:?}: bad record on line {}", path, idx + 2))?;
        rows.push(row);
    }

    Ok(rows)
}

/// Reads a CSV file without a fixed schema. Header names must be identifiers.
pub fn read_raw_table(path: &Path) -> Result<RawTable> {
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let mut reader = Reader::from_reader(file);

    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("{:?}: missing header", path))?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();
    if columns.is_empty() {
        anyhow::bail!("{:?}: header has no columns", path);
    }
    if let Some(bad) = columns.iter().find(|c| !is_sql_identifier(c)) {
        anyhow::bail!("{:?}: column name '{}' is not a plain identifier", path, bad);
    }
    let mut seen = HashSet::new();
    if let Some(dup) = columns.iter().find(|c| !seen.insert(c.to_string())) {
        anyhow::bail!(
            "{:?}: column '{}' appears more than once (headers are case-insensitive)",
            path,
            dup
        );
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("{:?}: bad record on line {}", path, idx + 2))?;
        rows.push(
            record
                .iter()
                .map(|v| (!v.is_empty()).then(|| v.to_string()))
                .collect(),
        );
    }

    Ok(RawTable { columns, rows })
}

/// Loads the source extracts into the database.
pub struct CsvImporter {
    pool: PgPool,
}

impl CsvImporter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replaces all five source tables with the CSVs found in `data_dir`.
    pub async fn load_all(&self, data_dir: &Path) -> Result<ImportSummary> {
        tracing::info!("Loading source CSVs from {}", data_dir.display());

        let customers: Vec<CustomerCsvRow> = read_rows(&data_dir.join(CUSTOMERS_CSV))?;
        let loans: Vec<LoanCsvRow> = read_rows(&data_dir.join(LOANS_CSV))?;
        let credits: Vec<CreditCsvRow> = read_rows(&data_dir.join(CREDITS_CSV))?;
        let repayments = read_raw_table(&data_dir.join(REPAYMENTS_CSV))?;
        let economic = read_raw_table(&data_dir.join(ECONOMIC_INDICATORS_CSV))?;

        let summary = ImportSummary {
            customers: self.replace_table(&customers).await?,
            loans: self.replace_table(&loans).await?,
            credits: self.replace_table(&credits).await?,
            repayments: self.replace_raw_table("repayments", &repayments).await?,
            economic_indicators: self
                .replace_raw_table("economic_indicators", &economic)
                .await?,
        };

        tracing::info!("✓ CSV data loaded into database: {:?}", summary);
        Ok(summary)
    }

    /// Drops, recreates and fills a typed table in one transaction.
    pub async fn replace_table<T: CsvTable>(&self, rows: &[T]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", T::TABLE))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("drop {}", T::TABLE))?;
        sqlx::query(T::CREATE_SQL)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("create {}", T::TABLE))?;

        for chunk in rows.chunks(BATCH_ROWS) {
            let mut qb: QueryBuilder<Postgres> =
                QueryBuilder::new(format!("INSERT INTO {} ({}) ", T::TABLE, T::COLUMNS));
            qb.push_values(chunk, |mut b, row| row.bind_row(&mut b));
            qb.build()
                .execute(&mut *tx)
                .await
                .with_context(|| format!("insert into {}", T::TABLE))?;
        }

        tx.commit().await?;
        tracing::debug!("Replaced {} with {} rows", T::TABLE, rows.len());
        Ok(rows.len())
    }

    /// Drops, recreates (all TEXT columns) and fills an untyped table.
    pub async fn replace_raw_table(&self, table: &str, data: &RawTable) -> Result<usize> {
        if !is_sql_identifier(table) {
            anyhow::bail!("table name '{}' is not a plain identifier", table);
        }
        let width = data.columns.len();
        if width == 0 {
            anyhow::bail!("{}: no columns to import", table);
        }
        if let Some(pos) = data.rows.iter().position(|r| r.len() != width) {
            anyhow::bail!(
                "{}: row {} has {} fields, expected {}",
                table,
                pos + 1,
                data.rows[pos].len(),
                width
            );
        }

        let quoted: Vec<String> = data.columns.iter().map(|c| quote_identifier(c)).collect();
        let column_defs = quoted
            .iter()
            .map(|c| format!("{} TEXT", c))
            .collect::<Vec<_>>()
            .join(", ");
        let column_list = quoted.join(", ");

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("drop {}", table))?;
        sqlx::query(&format!("CREATE TABLE {} ({})", table, column_defs))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("create {}", table))?;

        let batch = (MAX_BIND_PARAMS / width).clamp(1, BATCH_ROWS);
        for chunk in data.rows.chunks(batch) {
            let mut qb: QueryBuilder<Postgres> =
                QueryBuilder::new(format!("INSERT INTO {} ({}) ", table, column_list));
            qb.push_values(chunk, |mut b, row| {
                for value in row {
                    b.push_bind(value.clone());
                }
            });
            qb.build()
                .execute(&mut *tx)
                .await
                .with_context(|| format!("insert into {}", table))?;
        }

        tx.commit().await?;
        tracing::debug!("Replaced {} with {} rows", table, data.rows.len());
        Ok(data.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_customers_with_missing_categoricals() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            CUSTOMERS_CSV,
            "customer_id,age,annual_income,gender,marital_status,region\n\
             C0001,35,50000,Male,Single,North\n\
             C0002,51,72000.5,,,South\n",
        );

        let rows: Vec<CustomerCsvRow> = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].gender.as_deref(), Some("Male"));
        assert_eq!(rows[1].annual_income, 72000.5);
        assert_eq!(rows[1].gender, None);
        assert_eq!(rows[1].marital_status, None);
    }

    #[test]
    fn test_read_rows_reports_bad_line() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            LOANS_CSV,
            "customer_id,loan_amount,loan_term_months\nC0001,15000,36\nC0002,lots,12\n",
        );

        let err = read_rows::<LoanCsvRow>(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(read_rows::<CreditCsvRow>(&dir.path().join(CREDITS_CSV)).is_err());
    }

    #[test]
    fn test_read_raw_table() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            REPAYMENTS_CSV,
            "Customer_ID,Payment_Date,Amount\nC0001,2023-01-05,500\nC0001,,450\n",
        );

        let table = read_raw_table(&path).unwrap();
        assert_eq!(table.columns, vec!["customer_id", "payment_date", "amount"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][1], None);
        assert_eq!(table.rows[1][2].as_deref(), Some("450"));
    }

    #[test]
    fn test_raw_table_rejects_unsafe_header() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            ECONOMIC_INDICATORS_CSV,
            "month,\"gdp; DROP TABLE customers\"\n2023-01,1.2\n",
        );

        assert!(read_raw_table(&path).is_err());
    }

    #[test]
    fn test_raw_table_keeps_reserved_word_headers() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            REPAYMENTS_CSV,
            "id,Order,user,end\n1,2,alice,2023-12\n",
        );

        let table = read_raw_table(&path).unwrap();
        assert_eq!(table.columns, vec!["id", "order", "user", "end"]);

        let defs: Vec<String> = table.columns.iter().map(|c| quote_identifier(c)).collect();
        assert_eq!(defs, vec!["\"id\"", "\"order\"", "\"user\"", "\"end\""]);
    }

    #[test]
    fn test_raw_table_rejects_case_duplicate_headers() {
        let dir = tempdir().unwrap();
        let path = write_file(
            dir.path(),
            ECONOMIC_INDICATORS_CSV,
            "month,Rate,rate\n2023-01,1.2,1.3\n",
        );

        let err = read_raw_table(&path).unwrap_err();
        assert!(err.to_string().contains("'rate' appears more than once"));
    }

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("limit"), "\"limit\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_sql_identifier("economic_indicators"));
        assert!(is_sql_identifier("_x1"));
        assert!(!is_sql_identifier("1abc"));
        assert!(!is_sql_identifier("inflation rate"));
        assert!(!is_sql_identifier(""));
    }
}

//! Utility to bulk-load the source CSV extracts into the database.
//!
//! Usage: `load_csvs [DATA_DIR]` (defaults to the `DATA_DIR` setting).

use std::path::PathBuf;

use loan_risk_api::config::Config;
use loan_risk_api::csv_import::CsvImporter;
use loan_risk_api::db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.data_dir.clone());

    let db = Database::new(&config.database_url).await?;
    let summary = CsvImporter::new(db.pool.clone()).load_all(&data_dir).await?;

    println!("Loaded from {}:", data_dir.display());
    println!("  customers:           {}", summary.customers);
    println!("  loans:               {}", summary.loans);
    println!("  credits:             {}", summary.credits);
    println!("  repayments:          {}", summary.repayments);
    println!("  economic_indicators: {}", summary.economic_indicators);

    Ok(())
}

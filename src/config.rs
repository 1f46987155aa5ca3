use std::path::PathBuf;

use crate::classifier::NEUTRAL_BASE_SCORE;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Path to the XGBoost JSON tree dump.
    pub model_path: PathBuf,
    /// Expected SHA-256 of the model artifact, hex encoded.
    pub model_sha256: Option<String>,
    /// `base_score` the model was trained with (0.5 unless overridden).
    pub model_base_score: f64,
    /// Directory holding the source CSV files.
    pub data_dir: PathBuf,
    /// Bulk-load the source CSVs into the database at startup.
    pub load_csv_on_start: bool,
    /// Drop and recreate the prediction history table at startup.
    pub reset_predictions_on_start: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| validate_database_url(&url).map(|_| url))?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            model_path: std::env::var("MODEL_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "xgb_model.json".to_string())
                .into(),
            model_sha256: std::env::var("MODEL_SHA256")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            model_base_score: parse_base_score(
                std::env::var("MODEL_BASE_SCORE").ok().as_deref(),
            )?,
            data_dir: std::env::var("DATA_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| ".".to_string())
                .into(),
            load_csv_on_start: parse_flag(
                "LOAD_CSV_ON_START",
                std::env::var("LOAD_CSV_ON_START").ok().as_deref(),
            )?,
            reset_predictions_on_start: parse_flag(
                "RESET_PREDICTIONS_ON_START",
                std::env::var("RESET_PREDICTIONS_ON_START").ok().as_deref(),
            )?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Database URL: {}...", url_prefix(&config.database_url));
        tracing::debug!("Model path: {}", config.model_path.display());
        tracing::debug!("Model base_score: {}", config.model_base_score);
        if config.model_sha256.is_some() {
            tracing::info!("Model checksum verification enabled");
        }
        tracing::debug!("Data directory: {}", config.data_dir.display());
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

/// Accepts only non-empty PostgreSQL connection strings.
pub fn validate_database_url(url: &str) -> anyhow::Result<()> {
    if url.trim().is_empty() {
        anyhow::bail!("DB_URL cannot be empty");
    }
    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
    }
    Ok(())
}

/// First 20 characters of the connection string, for logs.
fn url_prefix(url: &str) -> String {
    url.chars().take(20).collect()
}

/// Parses `MODEL_BASE_SCORE`; unset means the neutral 0.5.
pub fn parse_base_score(value: Option<&str>) -> anyhow::Result<f64> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(NEUTRAL_BASE_SCORE);
    };
    let score: f64 = raw
        .parse()
        .map_err(|_| anyhow::anyhow!("MODEL_BASE_SCORE must be a number, got '{}'", raw))?;
    if !(score > 0.0 && score < 1.0) {
        anyhow::bail!("MODEL_BASE_SCORE must be strictly between 0 and 1, got {}", score);
    }
    Ok(score)
}

/// Parses an optional boolean environment value; unset means `false`.
pub fn parse_flag(name: &str, value: Option<&str>) -> anyhow::Result<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "" | "0" | "false" | "no" | "off" => Ok(false),
            "1" | "true" | "yes" | "on" => Ok(true),
            _ => anyhow::bail!("{} must be a boolean (true/false), got '{}'", name, v),
        },
    }
}

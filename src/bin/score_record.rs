//! Scores a single application offline, without touching the database.
//!
//! Usage: `score_record <record.json>`; reads stdin when the path is `-`.
//! The model is read from `MODEL_PATH` (default `xgb_model.json`) and
//! honours `MODEL_SHA256` and `MODEL_BASE_SCORE` like the server.

use anyhow::Context;
use std::io::Read;
use std::path::PathBuf;

use loan_risk_api::classifier::TreeEnsembleClassifier;
use loan_risk_api::config;
use loan_risk_api::models::{FeatureBreakdown, LoanApplicationRecord};
use loan_risk_api::prediction;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let input = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: score_record <record.json | ->"))?;
    let json = if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&input).with_context(|| format!("Failed to read {}", input))?
    };
    let record: LoanApplicationRecord =
        serde_json::from_str(&json).context("Failed to parse application record")?;

    let model_path: PathBuf = std::env::var("MODEL_PATH")
        .unwrap_or_else(|_| "xgb_model.json".to_string())
        .into();
    let model_sha256 = std::env::var("MODEL_SHA256").ok();
    let base_score =
        config::parse_base_score(std::env::var("MODEL_BASE_SCORE").ok().as_deref())?;
    let classifier = TreeEnsembleClassifier::load(&model_path, model_sha256.as_deref())?
        .with_base_score(base_score)?;

    let assessment = prediction::assess(&record, &classifier)?;
    let output = serde_json::json!({
        "risk_score": assessment.result.risk_score,
        "risk_category": assessment.result.risk_category,
        "features": FeatureBreakdown::from(&assessment.features),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

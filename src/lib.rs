//! Loan Default Risk API Library
//!
//! This library derives model features from customer/loan attributes,
//! scores them with a pre-trained gradient-boosted classifier, buckets the
//! probability into a risk category and keeps a history of predictions.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core scoring logic.
//! - `data`: Data access layer.
//! - `classifier`: Classifier trait and tree-ensemble model evaluation.
//! - `config`: Configuration management.
//! - `csv_import`: Bulk load of source CSV extracts.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Customer lookups and prediction history.
//! - `errors`: Error handling types.
//! - `features`: Feature derivation and the feature vector contract.
//! - `handlers`: HTTP request handlers.
//! - `model_integrity`: Checksum verification of the model artifact.
//! - `models`: Core data models.
//! - `prediction`: Scoring workflow shared by handlers.
//! - `scoring`: Risk score and category mapping.

pub mod api;
pub mod core;
pub mod data;

pub mod classifier;
pub mod config;
pub mod csv_import;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod features;
pub mod handlers;
pub mod model_integrity;
pub mod models;
pub mod prediction;
pub mod scoring;

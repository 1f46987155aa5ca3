//! Default-probability classifier.
//!
//! The model is trained elsewhere and exported as an XGBoost JSON tree dump
//! (`Booster.dump_model(path, dump_format="json")`). Inference runs on the
//! `gbdt` crate; this module checks the dump against the feature contract
//! before handing it over. Nothing is mutated after load, so a single
//! instance is shared across requests.
//!
//! The dump carries no `base_score`. The evaluator starts every margin at 0,
//! which equals a `base_score` of 0.5; other values are applied as an
//! explicit logit offset via [`TreeEnsembleClassifier::with_base_score`].

use gbdt::decision_tree::Data;
use gbdt::gradient_boost::GBDT;
use serde_json::Value;
use std::fmt;
use std::io::{BufReader, Cursor};
use std::path::Path;

use crate::errors::ClassifierError;
use crate::features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use crate::model_integrity;

/// Objective passed to the gbdt loader (sigmoid output).
const OBJECTIVE: &str = "binary:logistic";

/// `base_score` the dump evaluator implicitly assumes.
pub const NEUTRAL_BASE_SCORE: f64 = 0.5;

/// Capability to turn a feature vector into a probability of default.
pub trait Classifier: Send + Sync {
    /// Returns the probability of the positive (default) class in `[0, 1]`.
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ClassifierError>;
}

/// Gradient-boosted tree ensemble with a `binary:logistic` objective.
pub struct TreeEnsembleClassifier {
    model: GBDT,
    num_trees: usize,
    /// logit(base_score); zero for the neutral 0.5.
    base_margin: f64,
}

impl fmt::Debug for TreeEnsembleClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeEnsembleClassifier")
            .field("num_trees", &self.num_trees)
            .field("base_margin", &self.base_margin)
            .finish_non_exhaustive()
    }
}

impl TreeEnsembleClassifier {
    /// Parses an XGBoost JSON dump.
    ///
    /// Splits may name features either by position (`f2`) or by name
    /// (`credit_score`). Names are resolved against [`FEATURE_NAMES`], so a
    /// model trained on another column order or on unknown columns is
    /// rejected here rather than silently scoring the wrong inputs.
    pub fn from_json_str(json: &str) -> Result<Self, ClassifierError> {
        let mut trees: Value = serde_json::from_str(json)
            .map_err(|e| ClassifierError::Artifact(format!("invalid model JSON: {}", e)))?;

        let nodes = trees.as_array_mut().ok_or_else(|| {
            ClassifierError::Artifact("model dump must be a JSON array of trees".to_string())
        })?;
        if nodes.is_empty() {
            return Err(ClassifierError::Artifact("model has no trees".to_string()));
        }
        for (idx, tree) in nodes.iter_mut().enumerate() {
            normalize_node(tree)
                .map_err(|msg| ClassifierError::Artifact(format!("tree {}: {}", idx, msg)))?;
        }
        let num_trees = nodes.len();

        let dump = trees.to_string();
        let reader = BufReader::new(Cursor::new(dump.as_str()));
        let model = GBDT::from_xgboost_reader(reader, OBJECTIVE).map_err(|e| {
            ClassifierError::Artifact(format!("failed to parse XGBoost dump: {}", e))
        })?;

        Ok(Self {
            model,
            num_trees,
            base_margin: 0.0,
        })
    }

    /// Applies the `base_score` the model was trained with.
    pub fn with_base_score(mut self, base_score: f64) -> Result<Self, ClassifierError> {
        if !(base_score > 0.0 && base_score < 1.0) {
            return Err(ClassifierError::Artifact(format!(
                "base_score {} is not a probability",
                base_score
            )));
        }
        self.base_margin = logit(base_score) - logit(NEUTRAL_BASE_SCORE);
        Ok(self)
    }

    /// Reads the model from disk, verifying its SHA-256 digest when given.
    pub fn load(path: &Path, expected_sha256: Option<&str>) -> Result<Self, ClassifierError> {
        let bytes = std::fs::read(path).map_err(|e| {
            ClassifierError::Artifact(format!("failed to read {}: {}", path.display(), e))
        })?;

        if let Some(expected) = expected_sha256 {
            model_integrity::verify_checksum(&bytes, expected)?;
        }

        let json = std::str::from_utf8(&bytes)
            .map_err(|_| ClassifierError::Artifact("model file is not UTF-8".to_string()))?;
        let model = Self::from_json_str(json)?;

        tracing::info!(
            "Loaded classifier from {} ({} trees)",
            path.display(),
            model.num_trees()
        );
        Ok(model)
    }

    pub fn num_trees(&self) -> usize {
        self.num_trees
    }

    /// Evaluates a raw row. The row must have exactly the model's arity and
    /// finite values.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64, ClassifierError> {
        if row.len() != FEATURE_COUNT {
            return Err(ClassifierError::ShapeMismatch {
                expected: FEATURE_COUNT,
                actual: row.len(),
            });
        }
        if let Some(pos) = row.iter().position(|v| !v.is_finite()) {
            return Err(ClassifierError::Evaluation(format!(
                "{} is not finite: {}",
                FEATURE_NAMES[pos], row[pos]
            )));
        }

        // gbdt works in single precision
        let data = vec![Data::new_test_data(
            row.iter().map(|&v| v as f32).collect(),
            None,
        )];
        let raw = self
            .model
            .predict(&data)
            .first()
            .copied()
            .ok_or_else(|| {
                ClassifierError::Evaluation("model returned no prediction".to_string())
            })? as f64;

        let probability = if self.base_margin == 0.0 {
            raw
        } else {
            sigmoid(logit(raw) + self.base_margin)
        };
        if !probability.is_finite() {
            return Err(ClassifierError::Evaluation(format!(
                "raw output {} produced non-finite probability",
                raw
            )));
        }
        Ok(probability)
    }
}

impl Classifier for TreeEnsembleClassifier {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ClassifierError> {
        self.predict_row(features.as_slice())
    }
}

/// Validates one dump node (recursively) and rewrites named splits to the
/// positional `f<index>` form the evaluator reads.
fn normalize_node(node: &mut Value) -> Result<(), String> {
    let obj = node
        .as_object_mut()
        .ok_or_else(|| "node is not an object".to_string())?;

    if let Some(leaf) = obj.get("leaf") {
        return match leaf.as_f64() {
            Some(v) if v.is_finite() => Ok(()),
            _ => Err(format!("leaf value {} is not a number", leaf)),
        };
    }

    let split = obj
        .get("split")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "split node has no feature".to_string())?;
    let index = resolve_feature(&split)?;
    obj.insert("split".to_string(), Value::String(format!("f{}", index)));

    match obj.get_mut("children").and_then(Value::as_array_mut) {
        Some(children) if children.len() == 2 => {
            children.iter_mut().try_for_each(normalize_node)
        }
        _ => Err(format!("split on '{}' must have two children", split)),
    }
}

/// Maps a split feature (`f7` or `debt_to_income`) to its input position.
fn resolve_feature(split: &str) -> Result<usize, String> {
    if let Some(index) = FEATURE_NAMES.iter().position(|name| *name == split) {
        return Ok(index);
    }
    match split.strip_prefix('f').and_then(|n| n.parse::<usize>().ok()) {
        Some(index) if index < FEATURE_COUNT => Ok(index),
        Some(index) => Err(format!(
            "splits on feature {} but only {} features exist",
            index, FEATURE_COUNT
        )),
        None => Err(format!("splits on unknown feature '{}'", split)),
    }
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

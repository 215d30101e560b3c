//! Gradient-boosted tree ensemble loaded from XGBoost's JSON model format.
//!
//! Only the parts needed for regression inference are read:
//!
//! - `learner.learner_model_param.base_score`
//! - `learner.feature_names` (optional)
//! - `learner.objective.name` (must be an identity-link regression objective)
//! - `learner.gradient_booster.model.trees[*]` node arrays
//!
//! Node semantics follow XGBoost: an internal node routes left when
//! `x < split_condition`, missing values (NaN) follow `default_left`, and a leaf
//! (`left_children[i] == -1`) stores its output in `split_conditions[i]`.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{FeatureRow, FeatureScore};
use crate::models::importance::normalize_scores;
use crate::models::{ModelLoadError, PredictionError, RegressionModel};

/// Objectives whose prediction is the raw margin.
const IDENTITY_OBJECTIVES: [&str; 4] = [
    "reg:squarederror",
    "reg:linear",
    "reg:absoluteerror",
    "reg:pseudohubererror",
];

#[derive(Debug, Deserialize)]
struct ModelFile {
    learner: Learner,
}

#[derive(Debug, Deserialize)]
struct Learner {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: GradientBooster,
    learner_model_param: LearnerModelParam,
    #[serde(default)]
    objective: Option<Objective>,
}

#[derive(Debug, Deserialize)]
struct GradientBooster {
    name: String,
    model: Option<GbTreeModel>,
}

#[derive(Debug, Deserialize)]
struct GbTreeModel {
    trees: Vec<TreeJson>,
}

#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    base_score: String,
    #[serde(default)]
    num_feature: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Objective {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TreeJson {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    default_left: Vec<Value>,
}

#[derive(Debug, Clone)]
struct Tree {
    left: Vec<i64>,
    right: Vec<i64>,
    feature: Vec<usize>,
    condition: Vec<f64>,
    default_left: Vec<bool>,
}

impl Tree {
    fn from_json(raw: TreeJson, num_features: usize, tree_idx: usize) -> Result<Self, ModelLoadError> {
        let n = raw.left_children.len();
        if n == 0
            || raw.right_children.len() != n
            || raw.split_indices.len() != n
            || raw.split_conditions.len() != n
            || raw.default_left.len() != n
        {
            return Err(ModelLoadError::Invalid(format!(
                "tree {tree_idx}: node array lengths disagree"
            )));
        }

        let mut feature = Vec::with_capacity(n);
        let mut default_left = Vec::with_capacity(n);
        for i in 0..n {
            let (l, r) = (raw.left_children[i], raw.right_children[i]);
            let is_leaf = l == -1;
            if !is_leaf {
                // Children always come after their parent, which also rules out cycles.
                let valid = |c: i64| c > i as i64 && (c as usize) < n;
                if !valid(l) || !valid(r) {
                    return Err(ModelLoadError::Invalid(format!(
                        "tree {tree_idx}: node {i} has out-of-range children"
                    )));
                }
                let f = raw.split_indices[i];
                if f < 0 || f as usize >= num_features {
                    return Err(ModelLoadError::Invalid(format!(
                        "tree {tree_idx}: node {i} splits on unknown feature {f}"
                    )));
                }
            }
            feature.push(raw.split_indices[i].max(0) as usize);
            default_left.push(flag(&raw.default_left[i]));
        }

        Ok(Self {
            left: raw.left_children,
            right: raw.right_children,
            feature,
            condition: raw.split_conditions,
            default_left,
        })
    }

    fn predict(&self, x: &[f64]) -> f64 {
        let mut node = 0usize;
        loop {
            let left = self.left[node];
            if left == -1 {
                return self.condition[node];
            }
            let v = x[self.feature[node]];
            let go_left = if v.is_nan() {
                self.default_left[node]
            } else {
                v < self.condition[node]
            };
            node = if go_left { left as usize } else { self.right[node] as usize };
        }
    }

    fn split_features(&self) -> impl Iterator<Item = usize> + '_ {
        self.left
            .iter()
            .zip(&self.feature)
            .filter(|(l, _)| **l != -1)
            .map(|(_, f)| *f)
    }
}

/// Older exports write `default_left` as 0/1, newer ones as booleans.
fn flag(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    }
}

/// Base score is stored as a string, sometimes wrapped in brackets (`"[3.2E0]"`).
fn parse_base_score(raw: &str) -> Result<f64, ModelLoadError> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let first = trimmed.split(',').next().unwrap_or("").trim();
    first
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ModelLoadError::Invalid(format!("unparseable base_score '{raw}'")))
}

/// Regression ensemble over [`FeatureRow`] inputs.
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    trees: Vec<Tree>,
    base_score: f64,
    /// Model feature index -> canonical `FeatureRow` position.
    columns: Vec<usize>,
    feature_names: Vec<String>,
}

impl TreeEnsemble {
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let text = std::fs::read_to_string(path).map_err(|e| ModelLoadError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ModelLoadError> {
        let file: ModelFile =
            serde_json::from_str(text).map_err(|e| ModelLoadError::Format(e.to_string()))?;
        let learner = file.learner;

        if let Some(obj) = &learner.objective {
            if !IDENTITY_OBJECTIVES.contains(&obj.name.as_str()) {
                return Err(ModelLoadError::Invalid(format!(
                    "unsupported objective '{}'",
                    obj.name
                )));
            }
        }
        if learner.gradient_booster.name != "gbtree" {
            return Err(ModelLoadError::Invalid(format!(
                "unsupported booster '{}'",
                learner.gradient_booster.name
            )));
        }

        let (columns, feature_names) = resolve_columns(&learner)?;
        let base_score = parse_base_score(&learner.learner_model_param.base_score)?;

        let raw_trees = learner
            .gradient_booster
            .model
            .map(|m| m.trees)
            .ok_or_else(|| ModelLoadError::Format("missing gradient_booster.model".to_string()))?;
        let trees = raw_trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| Tree::from_json(t, columns.len(), i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            trees,
            base_score,
            columns,
            feature_names,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    fn predict_row(&self, row: &FeatureRow) -> f64 {
        let x: Vec<f64> = self
            .columns
            .iter()
            .map(|&c| row.get(c).unwrap_or(f64::NAN))
            .collect();
        self.base_score + self.trees.iter().map(|t| t.predict(&x)).sum::<f64>()
    }
}

/// Map the model's feature order onto `FeatureRow`.
///
/// Named models must only use known feature names; unnamed models are assumed
/// to follow the canonical training order.
fn resolve_columns(learner: &Learner) -> Result<(Vec<usize>, Vec<String>), ModelLoadError> {
    if !learner.feature_names.is_empty() {
        let mut columns = Vec::with_capacity(learner.feature_names.len());
        for name in &learner.feature_names {
            let pos = FeatureRow::position(name)
                .ok_or_else(|| ModelLoadError::Invalid(format!("unknown feature '{name}'")))?;
            columns.push(pos);
        }
        return Ok((columns, learner.feature_names.clone()));
    }

    let n = match &learner.learner_model_param.num_feature {
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| ModelLoadError::Invalid(format!("unparseable num_feature '{raw}'")))?,
        None => FeatureRow::NAMES.len(),
    };
    if n > FeatureRow::NAMES.len() {
        return Err(ModelLoadError::Invalid(format!(
            "model expects {n} features, at most {} are available",
            FeatureRow::NAMES.len()
        )));
    }
    let names = FeatureRow::NAMES[..n].iter().map(|s| s.to_string()).collect();
    Ok(((0..n).collect(), names))
}

impl RegressionModel for TreeEnsemble {
    fn name(&self) -> &str {
        "xgboost"
    }

    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, PredictionError> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let y = self.predict_row(row);
                if y.is_finite() {
                    Ok(y)
                } else {
                    Err(PredictionError::NonFinite { index: i })
                }
            })
            .collect()
    }

    /// Split counts per feature ("weight" importance).
    fn feature_importance(&self) -> Option<Vec<FeatureScore>> {
        let mut counts = vec![0usize; self.columns.len()];
        for tree in &self.trees {
            for f in tree.split_features() {
                counts[f] += 1;
            }
        }
        let raw = self
            .feature_names
            .iter()
            .zip(counts)
            .filter(|(_, c)| *c > 0)
            .map(|(name, c)| (name.clone(), c as f64))
            .collect();
        normalize_scores(raw)
    }
}

//! Native XGBoost model deserialization and inference.
//!
//! Reads the XGBoost >= 1.3 native JSON model format directly with serde,
//! so the calling application does not depend on the C library. Only the
//! `gbtree` booster is supported; that is what the route training pipeline
//! produces.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Errors from loading or interpreting a native model file.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse native model JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported gradient booster kind: {0}")]
    UnsupportedBooster(String),

    #[error("tree assigned to output group {group}, model declares {num_groups}")]
    InvalidTreeInfo { group: usize, num_groups: usize },
}

/// In-memory handle over a trained gradient-boosted tree ensemble.
///
/// Prediction walks each tree from the root: a row value below the split
/// condition goes left, otherwise right, and NaN values follow the tree's
/// `default_left` direction. Leaf values accumulate into per-class margins
/// which the objective transform turns into probabilities.
#[derive(Debug)]
pub struct Booster {
    trees: Vec<Tree>,
    tree_info: Vec<usize>,
    num_groups: usize,
    num_feature: usize,
    base_margin: f32,
    objective: String,
}

impl Booster {
    /// Load a booster from an XGBoost native JSON model file.
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let doc: ModelDoc = serde_json::from_reader(BufReader::new(file))?;
        Self::from_doc(doc)
    }

    /// Load a booster from an in-memory copy of the native JSON format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let doc: ModelDoc = serde_json::from_slice(bytes)?;
        Self::from_doc(doc)
    }

    fn from_doc(doc: ModelDoc) -> Result<Self, ModelError> {
        let learner = doc.learner;
        if learner.gradient_booster.name != "gbtree" {
            return Err(ModelError::UnsupportedBooster(
                learner.gradient_booster.name,
            ));
        }

        let model: GbTreeModel = serde_json::from_value(learner.gradient_booster.model)?;
        let num_groups = learner.learner_model_param.num_class.max(1);

        // Older single-class dumps omit tree_info; every tree then feeds group 0.
        let tree_info: Vec<usize> = if model.tree_info.is_empty() {
            vec![0; model.trees.len()]
        } else {
            model.tree_info.iter().map(|&g| g as usize).collect()
        };
        if let Some(&group) = tree_info.iter().find(|&&g| g >= num_groups) {
            return Err(ModelError::InvalidTreeInfo { group, num_groups });
        }

        debug!(
            num_trees = model.trees.len(),
            num_groups,
            objective = %learner.objective.name,
            "Parsed native booster"
        );

        Ok(Self {
            trees: model.trees,
            tree_info,
            num_groups,
            num_feature: learner.learner_model_param.num_feature,
            base_margin: base_margin(
                &learner.objective.name,
                learner.learner_model_param.base_score,
            ),
            objective: learner.objective.name,
        })
    }

    /// Number of features the model was trained on.
    pub fn num_features(&self) -> usize {
        self.num_feature
    }

    /// Number of output groups (classes; 1 for binary/regression models).
    pub fn num_class(&self) -> usize {
        self.num_groups
    }

    /// Number of trees in the ensemble.
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Objective the model was trained with, e.g. `multi:softprob`.
    pub fn objective(&self) -> &str {
        &self.objective
    }

    /// Raw per-group margins for a single feature row.
    ///
    /// Out-of-range feature indices are treated as missing, the same as NaN.
    pub fn predict_margin(&self, row: &[f32]) -> Vec<f32> {
        let mut margins = vec![self.base_margin; self.num_groups];
        for (tree, &group) in self.trees.iter().zip(&self.tree_info) {
            margins[group] += tree.leaf_value(row);
        }
        margins
    }

    /// Per-class probabilities for a single feature row.
    ///
    /// Applies softmax for multiclass objectives and the logistic transform
    /// for binary/logistic ones; other objectives return raw margins.
    pub fn predict_proba(&self, row: &[f32]) -> Vec<f32> {
        let margins = self.predict_margin(row);
        match self.objective.as_str() {
            name if name.starts_with("multi:") => softmax(margins),
            "binary:logistic" | "reg:logistic" => {
                margins.into_iter().map(sigmoid).collect()
            }
            _ => margins,
        }
    }
}

fn sigmoid(margin: f32) -> f32 {
    1.0 / (1.0 + (-margin).exp())
}

/// The native format stores `base_score` in output space; logistic
/// objectives need it mapped back to margin space (logit), so the default
/// saved value of 0.5 contributes a zero intercept. Other objectives use
/// it as the margin directly.
fn base_margin(objective: &str, base_score: f32) -> f32 {
    match objective {
        "binary:logistic" | "reg:logistic" => (base_score / (1.0 - base_score)).ln(),
        _ => base_score,
    }
}

fn softmax(mut margins: Vec<f32>) -> Vec<f32> {
    let max = margins.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for m in margins.iter_mut() {
        *m = (*m - max).exp();
        sum += *m;
    }
    for m in margins.iter_mut() {
        *m /= sum;
    }
    margins
}

// Serde mirror of the native JSON layout. Fields the predictor does not
// need (loss_changes, sum_hessian, categorical split tables, ...) are
// simply not declared and skipped during deserialization.

#[derive(Debug, Deserialize)]
struct ModelDoc {
    learner: Learner,
}

#[derive(Debug, Deserialize)]
struct Learner {
    gradient_booster: GradientBooster,
    learner_model_param: LearnerModelParam,
    objective: Objective,
}

#[derive(Debug, Deserialize)]
struct GradientBooster {
    name: String,
    model: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GbTreeModel {
    trees: Vec<Tree>,
    #[serde(default)]
    tree_info: Vec<i32>,
}

#[derive(Debug, Deserialize)]
struct Tree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<u32>,
    split_conditions: Vec<f32>,
    #[serde(default)]
    default_left: Vec<i32>,
}

impl Tree {
    /// Walk the tree for one row. Leaf values live in `split_conditions`
    /// at leaf positions, exactly as the native format stores them.
    fn leaf_value(&self, row: &[f32]) -> f32 {
        let mut nid = 0usize;
        loop {
            let left = self.left_children[nid];
            if left < 0 {
                return self.split_conditions[nid];
            }
            let value = row
                .get(self.split_indices[nid] as usize)
                .copied()
                .unwrap_or(f32::NAN);
            nid = if value.is_nan() {
                if self.default_left.get(nid).copied().unwrap_or(1) != 0 {
                    left as usize
                } else {
                    self.right_children[nid] as usize
                }
            } else if value < self.split_conditions[nid] {
                left as usize
            } else {
                self.right_children[nid] as usize
            };
        }
    }
}

/// XGBoost stores learner params as JSON strings ("5E-1", "6"); parse them
/// into their numeric types.
#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    #[serde(deserialize_with = "from_string")]
    base_score: f32,
    #[serde(deserialize_with = "from_string")]
    num_class: usize,
    #[serde(deserialize_with = "from_string")]
    num_feature: usize,
}

#[derive(Debug, Deserialize)]
struct Objective {
    name: String,
}

fn from_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = String::deserialize(deserializer)?;
    raw.trim().parse().map_err(serde::de::Error::custom)
}

//! Scoring: the pre-trained classifier behind a trait.
//!
//! The rest of the crate only sees `Scorer`. The shipped implementation
//! evaluates a gradient-boosted tree export; tests substitute stubs.

use crate::{
    dataset::ReferenceDataset,
    error::{DashError, DashResult},
    types::{FeatureName, FeatureRow},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Probability above which a row is labelled class 1.
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub label:       u8,
    pub probability: f64,
}

impl Prediction {
    /// Class 1 only when strictly above the threshold; a margin of exactly
    /// zero is class 0.
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        Self {
            label: u8::from(probability > threshold),
            probability,
        }
    }
}

pub trait Scorer {
    /// Feature names in the exact order `predict_proba` expects.
    fn feature_names(&self) -> &[FeatureName];

    /// P(class 1) for each row. Rows are already aligned to `feature_names()`.
    fn predict_proba(&self, rows: &[Vec<f64>]) -> DashResult<Vec<f64>>;

    fn decision_threshold(&self) -> f64 {
        DEFAULT_DECISION_THRESHOLD
    }

    /// Label and probability per aligned row.
    fn predict(&self, rows: &[Vec<f64>]) -> DashResult<Vec<Prediction>> {
        let threshold = self.decision_threshold();
        Ok(self
            .predict_proba(rows)?
            .into_iter()
            .map(|p| Prediction::from_probability(p, threshold))
            .collect())
    }
}

/// Align each record to the scorer's feature order, then predict.
pub fn score_records(scorer: &dyn Scorer, records: &[FeatureRow]) -> DashResult<Vec<Prediction>> {
    let rows = records
        .iter()
        .map(|r| r.align(scorer.feature_names()))
        .collect::<DashResult<Vec<_>>>()?;
    scorer.predict(&rows)
}

pub fn score_record(scorer: &dyn Scorer, record: &FeatureRow) -> DashResult<Prediction> {
    score_records(scorer, std::slice::from_ref(record))?
        .pop()
        .ok_or_else(|| DashError::computation("Scorer returned no prediction"))
}

/// Score every dataset row, target column dropped.
pub fn score_dataset(scorer: &dyn Scorer, dataset: &ReferenceDataset) -> DashResult<Vec<Prediction>> {
    let matrix = dataset.feature_matrix(scorer.feature_names())?;
    let predictions = scorer.predict(&matrix)?;
    log::debug!("scored {} dataset rows", predictions.len());
    Ok(predictions)
}

// ── Tree ensemble export ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature:   usize,
        threshold: f64,
        left:      usize,
        right:     usize,
        /// Direction taken when the feature value is NaN.
        #[serde(default)]
        default_left: bool,
    },
    Leaf {
        leaf: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn margin(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { leaf } => return *leaf,
                TreeNode::Split { feature, threshold, left, right, default_left } => {
                    let x = row[*feature];
                    idx = if x.is_nan() {
                        if *default_left { *left } else { *right }
                    } else if x < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// A binary-logistic tree ensemble exported to JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub feature_names: Vec<FeatureName>,
    /// Margin (log-odds) added before the tree outputs.
    #[serde(default)]
    pub base_margin: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    pub trees: Vec<Tree>,
}

fn default_threshold() -> f64 {
    DEFAULT_DECISION_THRESHOLD
}

impl TreeEnsemble {
    pub fn load(path: &Path) -> DashResult<Self> {
        let shown = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| DashError::resource(&shown, e))?;
        let model: Self = serde_json::from_str(&content).map_err(|e| DashError::resource(&shown, e))?;
        model.validate().map_err(|reason| DashError::resource(&shown, reason))?;
        log::info!(
            "loaded model {shown}: {} trees over {} features",
            model.trees.len(),
            model.feature_names.len()
        );
        Ok(model)
    }

    /// Every split must reference a known feature and point strictly
    /// forward, so traversal always terminates at a leaf.
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_names.is_empty() {
            return Err("model has no features".into());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {t} has no nodes"));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                if let TreeNode::Split { feature, left, right, .. } = node {
                    if *feature >= self.feature_names.len() {
                        return Err(format!("tree {t} node {i}: feature index {feature} out of range"));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= tree.nodes.len() {
                            return Err(format!("tree {t} node {i}: bad child index {child}"));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn probability(&self, row: &[f64]) -> f64 {
        let margin = self.base_margin + self.trees.iter().map(|t| t.margin(row)).sum::<f64>();
        1.0 / (1.0 + (-margin).exp())
    }
}

impl Scorer for TreeEnsemble {
    fn feature_names(&self) -> &[FeatureName] {
        &self.feature_names
    }

    fn predict_proba(&self, rows: &[Vec<f64>]) -> DashResult<Vec<f64>> {
        let width = self.feature_names.len();
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() != width {
                    return Err(DashError::computation(format!(
                        "Row {i} has {} features, model expects {width}",
                        row.len()
                    )));
                }
                Ok(self.probability(row))
            })
            .collect()
    }

    fn decision_threshold(&self) -> f64 {
        self.threshold
    }
}

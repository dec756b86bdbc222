//! Per-prediction attribution behind the `Explainer` trait.
//!
//! The shipped `BaselineExplainer` attributes by substitution against a
//! fixed background sample: for each feature it swaps in the background
//! row's value and averages how much the probability moves.

use crate::{
    error::{DashError, DashResult},
    model::Scorer,
    types::FeatureName,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureContribution {
    pub feature:      FeatureName,
    pub value:        f64,
    #[serde(rename = "shap_value")]
    pub contribution: f64,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub base_value:   f64,
    pub explanations: Vec<FeatureContribution>,
}

pub trait Explainer {
    /// Attribute `row` (aligned to `scorer.feature_names()`). Display names
    /// are filled in by the caller; implementations may leave them equal to
    /// the feature name.
    fn explain(&self, scorer: &dyn Scorer, row: &[f64]) -> DashResult<Explanation>;
}

/// Sort by descending absolute contribution; ties keep feature order.
pub fn rank_contributions(contributions: &mut [FeatureContribution]) {
    contributions.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
}

pub struct BaselineExplainer {
    background: Vec<Vec<f64>>,
}

impl BaselineExplainer {
    pub fn new(background: Vec<Vec<f64>>) -> Self {
        Self { background }
    }

    pub fn background_len(&self) -> usize {
        self.background.len()
    }
}

impl Explainer for BaselineExplainer {
    fn explain(&self, scorer: &dyn Scorer, row: &[f64]) -> DashResult<Explanation> {
        if self.background.is_empty() {
            return Err(DashError::computation("Explainer background sample is empty"));
        }
        let names = scorer.feature_names();
        if row.len() != names.len() {
            return Err(DashError::computation(format!(
                "Row has {} features, model expects {}",
                row.len(),
                names.len()
            )));
        }

        let n = self.background.len() as f64;
        let base_value = scorer.predict_proba(&self.background)?.iter().sum::<f64>() / n;
        let full = scorer
            .predict_proba(std::slice::from_ref(&row.to_vec()))?
            .first()
            .copied()
            .ok_or_else(|| DashError::computation("Scorer returned no probability"))?;

        let mut explanations = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let perturbed: Vec<Vec<f64>> = self
                .background
                .iter()
                .map(|b| {
                    let mut r = row.to_vec();
                    r[i] = b[i];
                    r
                })
                .collect();
            let mean_without = scorer.predict_proba(&perturbed)?.iter().sum::<f64>() / n;
            explanations.push(FeatureContribution {
                feature:      name.clone(),
                value:        row[i],
                contribution: full - mean_without,
                display_name: name.clone(),
            });
        }
        rank_contributions(&mut explanations);

        Ok(Explanation { base_value, explanations })
    }
}

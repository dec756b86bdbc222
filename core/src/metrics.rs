//! Binary classification metrics over the reference dataset.
//!
//! Class 1 is the positive class throughout. Ratios whose denominator is
//! zero report 0 instead of failing.

use crate::error::{DashError, DashResult};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_negatives:  u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub true_positives:  u64,
}

impl ConfusionMatrix {
    pub fn from_labels(actual: &[u8], predicted: &[u8]) -> DashResult<Self> {
        if actual.len() != predicted.len() {
            return Err(DashError::computation(format!(
                "{} labels but {} predictions",
                actual.len(),
                predicted.len()
            )));
        }
        let mut cm = Self::default();
        for (&a, &p) in actual.iter().zip(predicted) {
            match (a, p) {
                (0, 0) => cm.true_negatives += 1,
                (0, _) => cm.false_positives += 1,
                (_, 0) => cm.false_negatives += 1,
                _      => cm.true_positives += 1,
            }
        }
        Ok(cm)
    }

    pub fn total(&self) -> u64 {
        self.true_negatives + self.false_positives + self.false_negatives + self.true_positives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_negatives + self.true_positives, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        ratio(
            2 * self.true_positives,
            2 * self.true_positives + self.false_positives + self.false_negatives,
        )
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Area under the ROC curve via the rank-sum statistic. Tied scores share
/// their average rank. Both classes must be present.
pub fn roc_auc(actual: &[u8], scores: &[f64]) -> DashResult<f64> {
    if actual.len() != scores.len() {
        return Err(DashError::computation(format!(
            "{} labels but {} scores",
            actual.len(),
            scores.len()
        )));
    }
    let positives = actual.iter().filter(|&&a| a != 0).count();
    let negatives = actual.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(DashError::computation(
            "Only one class present in labels; ROC AUC is undefined",
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; the tie group i..=j shares their mean.
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if actual[idx] != 0 {
                positive_rank_sum += avg_rank;
            }
        }
        i = j + 1;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Ok((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub accuracy:  f64,
    pub precision: f64,
    pub recall:    f64,
    pub f1_score:  f64,
    pub auc:       f64,
    pub confusion: ConfusionMatrix,
}

pub fn evaluate(actual: &[u8], predicted: &[u8], scores: &[f64]) -> DashResult<ClassificationReport> {
    let confusion = ConfusionMatrix::from_labels(actual, predicted)?;
    Ok(ClassificationReport {
        accuracy:  confusion.accuracy(),
        precision: confusion.precision(),
        recall:    confusion.recall(),
        f1_score:  confusion.f1(),
        auc:       roc_auc(actual, scores)?,
        confusion,
    })
}

//! Model service operations: single and batch scoring, importances,
//! metrics, dataset statistics and per-prediction explanations.
//!
//! Inputs here are complete feature records (already engineered). Each is
//! aligned to the model's feature order before scoring; a missing feature
//! fails the whole request.

use crate::{
    dashboard::top_indices,
    error::DashResult,
    explain::{rank_contributions, Explanation},
    metrics::{self, ConfusionMatrix},
    model::{score_dataset, score_record, score_records, Prediction},
    resources::ResourceStore,
    types::{FeatureName, FeatureRow},
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassProbabilities {
    pub prediction:          u8,
    pub probability_class_0: f64,
    pub probability_class_1: f64,
}

impl From<Prediction> for ClassProbabilities {
    fn from(p: Prediction) -> Self {
        Self {
            prediction:          p.label,
            probability_class_0: 1.0 - p.probability,
            probability_class_1: p.probability,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexedPrediction {
    pub index: usize,
    #[serde(flatten)]
    pub probabilities: ClassProbabilities,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchPredictions {
    pub results: Vec<IndexedPrediction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature:      FeatureName,
    pub importance:   f64,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportanceReport {
    pub feature_importance: Vec<FeatureImportance>,
}

/// Confusion counts under the model service's singular key names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfusionCounts {
    pub true_negative:  u64,
    pub false_positive: u64,
    pub false_negative: u64,
    pub true_positive:  u64,
}

impl From<ConfusionMatrix> for ConfusionCounts {
    fn from(cm: ConfusionMatrix) -> Self {
        Self {
            true_negative:  cm.true_negatives,
            false_positive: cm.false_positives,
            false_negative: cm.false_negatives,
            true_positive:  cm.true_positives,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsBody {
    pub accuracy:         f64,
    pub precision:        f64,
    pub recall:           f64,
    pub f1_score:         f64,
    pub roc_auc:          f64,
    pub confusion_matrix: ConfusionCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetrics {
    pub metrics: MetricsBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassDistribution {
    pub class_0: u64,
    pub class_1: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub total_records:      u64,
    pub class_distribution: ClassDistribution,
    pub feature_count:      usize,
    pub features:           Vec<FeatureName>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStatsReport {
    pub stats: DatasetStats,
}

// ── Operations ───────────────────────────────────────────────────────────────

pub fn predict_single(store: &ResourceStore, record: &FeatureRow) -> DashResult<ClassProbabilities> {
    Ok(score_record(store.scorer()?, record)?.into())
}

pub fn predict_batch(store: &ResourceStore, records: &[FeatureRow]) -> DashResult<BatchPredictions> {
    let predictions = score_records(store.scorer()?, records)?;
    log::debug!("batch scored {} records", predictions.len());
    Ok(BatchPredictions {
        results: predictions
            .into_iter()
            .enumerate()
            .map(|(index, p)| IndexedPrediction { index, probabilities: p.into() })
            .collect(),
    })
}

/// Every model feature with its importance, most important first.
pub fn feature_importance(store: &ResourceStore) -> DashResult<FeatureImportanceReport> {
    let scorer = store.scorer()?;
    let feature_map = store.feature_map()?;
    let names = scorer.feature_names();
    let importances = store.importance()?.aligned(names);

    Ok(FeatureImportanceReport {
        feature_importance: top_indices(&importances, names.len())
            .into_iter()
            .map(|i| FeatureImportance {
                feature:      names[i].clone(),
                importance:   importances[i],
                display_name: feature_map.display_name(&names[i]),
            })
            .collect(),
    })
}

pub fn model_metrics(store: &ResourceStore) -> DashResult<ModelMetrics> {
    let scorer = store.scorer()?;
    let dataset = store.dataset()?;
    let labels = dataset.labels()?;
    let predictions = score_dataset(scorer, dataset)?;
    let predicted: Vec<u8> = predictions.iter().map(|p| p.label).collect();
    let scores: Vec<f64> = predictions.iter().map(|p| p.probability).collect();

    let report = metrics::evaluate(&labels, &predicted, &scores)?;
    Ok(ModelMetrics {
        metrics: MetricsBody {
            accuracy:         report.accuracy,
            precision:        report.precision,
            recall:           report.recall,
            f1_score:         report.f1_score,
            roc_auc:          report.auc,
            confusion_matrix: report.confusion.into(),
        },
    })
}

pub fn dataset_stats(store: &ResourceStore) -> DashResult<DatasetStatsReport> {
    let dataset = store.dataset()?;
    let labels = dataset.labels()?;
    let features = dataset.feature_columns();
    let class_1 = labels.iter().filter(|&&l| l == 1).count() as u64;

    Ok(DatasetStatsReport {
        stats: DatasetStats {
            total_records: labels.len() as u64,
            class_distribution: ClassDistribution {
                class_0: labels.len() as u64 - class_1,
                class_1,
            },
            feature_count: features.len(),
            features,
        },
    })
}

/// Attribute one prediction to its features, with display names filled in.
pub fn explain_prediction(store: &ResourceStore, record: &FeatureRow) -> DashResult<Explanation> {
    let scorer = store.scorer()?;
    let row = record.align(scorer.feature_names())?;
    let mut explanation = store.explainer()?.explain(scorer, &row)?;

    let feature_map = store.feature_map()?;
    for c in &mut explanation.explanations {
        c.display_name = feature_map.display_name(&c.feature);
    }
    rank_contributions(&mut explanation.explanations);
    Ok(explanation)
}

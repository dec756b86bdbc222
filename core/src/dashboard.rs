//! Executive dashboard operations: overview, behaviour, portfolio,
//! performance, per-customer risk and advanced patterns.
//!
//! Each operation:
//!   1. Pulls what it needs from the `ResourceStore`
//!   2. Copies the dataset columns it reduces (the dataset is never mutated)
//!   3. Hands them to `aggregate` / `metrics` and assembles the payload
//!
//! Depends on: resources, features, model, aggregate, metrics.

use crate::{
    aggregate::{self, LabelledCounts, PaybackSegment, RiskDistribution, RiskLevel},
    error::{DashError, DashResult},
    features::engineer,
    metrics::{self, ConfusionMatrix},
    model::{score_dataset, score_record, Prediction},
    resources::ResourceStore,
    types::{FeatureName, FeatureRow, PartialRecord},
};
use chrono::{NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::BTreeMap;

// ── Dataset columns read here ────────────────────────────────────────────────

pub const COL_SPEND_30D: &str = "avg_daily_spend_30d";
pub const COL_SPEND_90D: &str = "avg_daily_spend_90d";
pub const COL_RECHARGE_COUNT_30D: &str = "main_recharge_count_30d";
pub const COL_RECHARGE_COUNT_90D: &str = "main_recharge_count_90d";
pub const COL_BALANCE_30D: &str = "avg_main_balance_30d";
pub const COL_LOAN_COUNT_30D: &str = "loan_count_30d";
pub const COL_PAYBACK_90D: &str = "avg_payback_time_90d";
pub const COL_MONTH: &str = "date_month";
pub const COL_DAY: &str = "date_day";

const HISTOGRAM_BINS: usize = 10;
const TOP_FACTORS: usize = 5;

// ── Payloads ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_customers:        u64,
    pub delinquent_count:       u64,
    pub delinquency_rate:       f64,
    /// Share of customers in the High band, in percent.
    pub at_risk_percentage:     f64,
    pub risk_distribution:      RiskDistribution,
    pub avg_daily_spend_30d:    f64,
    pub avg_recharge_count_30d: f64,
    pub avg_loan_count_30d:     f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviourInsights {
    pub spending_by_month:    BTreeMap<u32, f64>,
    pub recharge_by_month:    BTreeMap<u32, f64>,
    pub balance_by_month:     BTreeMap<u32, f64>,
    pub spending_delinquency: serde_json::Map<String, serde_json::Value>,
    pub avg_spend_30d:        f64,
    pub avg_spend_90d:        f64,
    pub avg_recharge_30d:     f64,
    pub avg_recharge_90d:     f64,
    /// Rounded payback time → count, repaid customers.
    pub payback90_label0:     BTreeMap<i64, u64>,
    /// Rounded payback time → count, delinquent customers, zeros excluded.
    pub payback90_label1:     BTreeMap<i64, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioRisk {
    pub risk_bands:               LabelledCounts,
    pub probability_distribution: Vec<u64>,
    pub mean_probability:         f64,
    pub median_probability:       f64,
    pub std_probability:          f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPerformance {
    pub accuracy:         f64,
    pub f1_score:         f64,
    pub auc:              f64,
    pub confusion_matrix: ConfusionMatrix,
    pub precision:        f64,
    pub recall:           f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskFactor {
    pub feature:      FeatureName,
    pub display_name: String,
    pub importance:   f64,
    pub value:        f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRisk {
    pub prediction:  u8,
    pub probability: f64,
    pub risk_level:  RiskLevel,
    pub top_factors: Vec<RiskFactor>,
}

/// Risk for raw base inputs, with the engineered values that were scored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineeredRisk {
    pub base_inputs:      PartialRecord,
    pub derived_features: FeatureRow,
    pub prediction:       CustomerRisk,
    #[serde(skip)]
    pub features:         FeatureRow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanTimePoint {
    pub date:        NaiveDateTime,
    pub label:       u8,
    pub cnt_loans30: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvancedPatterns {
    /// Payback buckets for repaid customers, zero bucket included.
    pub payback_label0_grouped: LabelledCounts,
    /// Payback buckets for delinquent customers, rounded zeros excluded.
    pub payback_label1_grouped: LabelledCounts,
    pub loan_time_series:       Vec<LoanTimePoint>,
}

// ── Operations ───────────────────────────────────────────────────────────────

pub fn overview(store: &ResourceStore) -> DashResult<Overview> {
    let (scorer, dataset, _) = store.load()?;
    let labels = dataset.labels()?;
    let probabilities = probabilities(&score_dataset(scorer, dataset)?);

    let total = labels.len() as u64;
    let delinquent = labels.iter().filter(|&&l| l == 0).count() as u64;
    let risk_distribution = aggregate::risk_distribution(&probabilities);

    Ok(Overview {
        total_customers: total,
        delinquent_count: delinquent,
        delinquency_rate: aggregate::delinquency_rate(&labels)?,
        at_risk_percentage: risk_distribution.high as f64 / total as f64 * 100.0,
        risk_distribution,
        avg_daily_spend_30d: aggregate::mean(&dataset.column(COL_SPEND_30D)?)?,
        avg_recharge_count_30d: aggregate::mean(&dataset.column(COL_RECHARGE_COUNT_30D)?)?,
        avg_loan_count_30d: aggregate::mean(&dataset.column(COL_LOAN_COUNT_30D)?)?,
    })
}

pub fn behaviour(store: &ResourceStore) -> DashResult<BehaviourInsights> {
    let dataset = store.dataset()?;
    let labels = dataset.labels()?;
    let months = dataset.column(COL_MONTH)?;
    let spend_30d = dataset.column(COL_SPEND_30D)?;
    let recharge_30d = dataset.column(COL_RECHARGE_COUNT_30D)?;
    let payback = dataset.column(COL_PAYBACK_90D)?;

    let spending_delinquency = aggregate::quartile_delinquency(&spend_30d, &labels)?
        .into_iter()
        .map(|b| (b.bucket, serde_json::Value::from(b.rate)))
        .collect();

    Ok(BehaviourInsights {
        spending_by_month: aggregate::mean_by_month(&months, &spend_30d)?,
        recharge_by_month: aggregate::mean_by_month(&months, &recharge_30d)?,
        balance_by_month: aggregate::mean_by_month(&months, &dataset.column(COL_BALANCE_30D)?)?,
        spending_delinquency,
        avg_spend_30d: aggregate::mean(&spend_30d)?,
        avg_spend_90d: aggregate::mean(&dataset.column(COL_SPEND_90D)?)?,
        avg_recharge_30d: aggregate::mean(&recharge_30d)?,
        avg_recharge_90d: aggregate::mean(&dataset.column(COL_RECHARGE_COUNT_90D)?)?,
        payback90_label0: aggregate::payback_value_counts(&payback, &labels, PaybackSegment::Repaid)?,
        payback90_label1: aggregate::payback_value_counts(&payback, &labels, PaybackSegment::Delinquent)?,
    })
}

pub fn portfolio(store: &ResourceStore) -> DashResult<PortfolioRisk> {
    let (scorer, dataset, _) = store.load()?;
    let probabilities = probabilities(&score_dataset(scorer, dataset)?);

    Ok(PortfolioRisk {
        risk_bands: aggregate::portfolio_bands(&probabilities),
        probability_distribution: aggregate::probability_histogram(&probabilities, HISTOGRAM_BINS),
        mean_probability: aggregate::mean(&probabilities)?,
        median_probability: aggregate::median(&probabilities)?,
        std_probability: aggregate::std_dev(&probabilities, 0)
            .ok_or_else(|| DashError::computation("Standard deviation of an empty set"))?,
    })
}

pub fn performance(store: &ResourceStore) -> DashResult<ModelPerformance> {
    let (scorer, dataset, _) = store.load()?;
    let labels = dataset.labels()?;
    let predictions = score_dataset(scorer, dataset)?;
    let predicted: Vec<u8> = predictions.iter().map(|p| p.label).collect();

    let report = metrics::evaluate(&labels, &predicted, &probabilities(&predictions))?;
    Ok(ModelPerformance {
        accuracy: report.accuracy,
        f1_score: report.f1_score,
        auc: report.auc,
        confusion_matrix: report.confusion,
        precision: report.precision,
        recall: report.recall,
    })
}

/// Score one customer and rank the model's globally most important
/// features alongside the customer's value for each.
pub fn predict_risk(store: &ResourceStore, customer: &FeatureRow) -> DashResult<CustomerRisk> {
    let scorer = store.scorer()?;
    let feature_map = store.feature_map()?;
    let prediction = score_record(scorer, customer)?;

    let names = scorer.feature_names();
    let importances = store.importance()?.aligned(names);
    let top_factors = top_indices(&importances, TOP_FACTORS)
        .into_iter()
        .map(|i| RiskFactor {
            feature: names[i].clone(),
            display_name: feature_map.display_name(&names[i]),
            importance: importances[i],
            value: customer.get_or_zero(&names[i]),
        })
        .collect();

    Ok(CustomerRisk {
        prediction: prediction.label,
        probability: prediction.probability,
        risk_level: RiskLevel::from_probability(prediction.probability),
        top_factors,
    })
}

/// Fill and derive features from raw base inputs, then score the result
/// the same way `predict_risk` scores a complete record.
pub fn predict_from_inputs(store: &ResourceStore, input: &PartialRecord) -> DashResult<EngineeredRisk> {
    let engineered = engineer(input, store.medians()?);
    let prediction = predict_risk(store, &engineered.features)?;
    Ok(EngineeredRisk {
        base_inputs: engineered.base_inputs,
        derived_features: engineered.derived_features,
        prediction,
        features: engineered.features,
    })
}

pub fn advanced_patterns(store: &ResourceStore) -> DashResult<AdvancedPatterns> {
    let dataset = store.dataset()?;
    let labels = dataset.labels()?;
    let payback = dataset.column(COL_PAYBACK_90D)?;
    let dates = aggregate::synthesize_dates(
        store.config().assumed_year,
        &dataset.column(COL_MONTH)?,
        &dataset.column(COL_DAY)?,
    )?;

    let loan_time_series = aggregate::mean_by_date_and_label(
        &dates,
        &labels,
        &dataset.column(COL_LOAN_COUNT_30D)?,
    )?
    .into_iter()
    .map(|g| LoanTimePoint {
        date: g.date.and_time(NaiveTime::default()),
        label: g.label,
        cnt_loans30: g.mean,
    })
    .collect();

    Ok(AdvancedPatterns {
        payback_label0_grouped: aggregate::payback_distribution(&payback, &labels, PaybackSegment::Repaid)?,
        payback_label1_grouped: aggregate::payback_distribution(&payback, &labels, PaybackSegment::Delinquent)?,
        loan_time_series,
    })
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn probabilities(predictions: &[Prediction]) -> Vec<f64> {
    predictions.iter().map(|p| p.probability).collect()
}

/// Indices of the `k` largest values, largest first. Equal values keep
/// their original order.
pub fn top_indices(values: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    order.truncate(k);
    order
}

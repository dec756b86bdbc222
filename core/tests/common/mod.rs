//! Shared fixtures for the integration tests.
//!
//! The in-memory dataset mirrors tests/fixtures/telecom_clean.csv row for
//! row. `score_hint` is the probability the stub scorer returns, so every
//! probability-based number in the tests can be worked out by hand.

#![allow(dead_code)]

use delinquency_core::{
    config::DashboardConfig,
    dataset::ReferenceDataset,
    error::DashResult,
    features::MedianTable,
    forecast::{DailyRate, ForecastPoint, Forecaster},
    model::Scorer,
    resources::{FeatureMap, ImportanceTable, ResourceStore},
    types::FeatureName,
};
use std::{collections::HashMap, path::PathBuf};

pub const COLUMNS: &[&str] = &[
    "date_month",
    "date_day",
    "avg_daily_spend_30d",
    "avg_daily_spend_90d",
    "main_recharge_count_30d",
    "main_recharge_count_90d",
    "avg_main_balance_30d",
    "loan_count_30d",
    "avg_payback_time_90d",
    "score_hint",
    "loan_repaid_5days",
];

pub const ROWS: &[[f64; 11]] = &[
    [1.0, 1.0, 10.0, 12.0, 2.0, 6.0, 100.0, 1.0, 0.0, 0.05, 1.0],
    [1.0, 1.0, 20.0, 18.0, 3.0, 8.0, 200.0, 3.0, 2.4, 0.15, 1.0],
    [1.0, 2.0, 30.0, 25.0, 1.0, 4.0, 50.0, 2.0, 0.4, 0.35, 0.0],
    [1.0, 2.0, 40.0, 41.0, 4.0, 9.0, 300.0, 4.0, 7.5, 0.55, 1.0],
    [2.0, 1.0, 50.0, 45.0, 5.0, 12.0, 400.0, 5.0, 25.0, 0.72, 0.0],
    [2.0, 1.0, 60.0, 70.0, 2.0, 5.0, 80.0, 6.0, 45.0, 0.90, 0.0],
    [2.0, 2.0, 70.0, 66.0, 6.0, 14.0, 500.0, 2.0, 95.0, 0.25, 1.0],
    [2.0, 2.0, 80.0, 90.0, 3.0, 7.0, 250.0, 1.0, 0.5, 0.67, 0.0],
];

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

pub fn dataset() -> ReferenceDataset {
    dataset_from(ROWS.iter().map(|r| r.to_vec()).collect())
}

pub fn dataset_from(rows: Vec<Vec<f64>>) -> ReferenceDataset {
    ReferenceDataset::new(
        COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
        "loan_repaid_5days",
    )
    .expect("fixture dataset")
}

/// Returns the first aligned feature as the probability.
pub struct HintScorer {
    names: Vec<FeatureName>,
}

impl HintScorer {
    pub fn new() -> Self {
        Self {
            names: vec!["score_hint".into(), "loan_count_30d".into()],
        }
    }
}

impl Scorer for HintScorer {
    fn feature_names(&self) -> &[FeatureName] {
        &self.names
    }

    fn predict_proba(&self, rows: &[Vec<f64>]) -> DashResult<Vec<f64>> {
        Ok(rows.iter().map(|r| r[0]).collect())
    }
}

/// p = 0.1·x0 + 0.2·x1, so substitution attributions are exact.
pub struct LinearScorer {
    names: Vec<FeatureName>,
}

impl LinearScorer {
    pub fn new() -> Self {
        Self {
            names: vec!["x0".into(), "x1".into()],
        }
    }
}

impl Scorer for LinearScorer {
    fn feature_names(&self) -> &[FeatureName] {
        &self.names
    }

    fn predict_proba(&self, rows: &[Vec<f64>]) -> DashResult<Vec<f64>> {
        Ok(rows.iter().map(|r| 0.1 * r[0] + 0.2 * r[1]).collect())
    }
}

/// Predicts the same rate for every future day.
pub struct FlatForecaster(pub f64);

impl Forecaster for FlatForecaster {
    fn fit_and_forecast(&self, series: &[DailyRate], horizon_days: u32) -> DashResult<Vec<ForecastPoint>> {
        let last = series.last().expect("non-empty series").date;
        Ok((1..=i64::from(horizon_days))
            .map(|d| ForecastPoint {
                date:           last + chrono::Duration::days(d),
                predicted_rate: self.0,
                lower_bound:    self.0 - 1.0,
                upper_bound:    self.0 + 1.0,
            })
            .collect())
    }
}

pub fn feature_map() -> FeatureMap {
    FeatureMap::new(HashMap::from([
        ("score_hint".to_string(), "Score Hint".to_string()),
        ("loan_count_30d".to_string(), "Loan Count (30d)".to_string()),
    ]))
}

pub fn importance() -> ImportanceTable {
    ImportanceTable::new(HashMap::from([
        ("score_hint".to_string(), 0.8),
        ("loan_count_30d".to_string(), 0.2),
    ]))
}

pub fn medians() -> MedianTable {
    MedianTable::new(HashMap::from([
        ("sim_age_days".to_string(), 540.0),
        ("avg_daily_spend_30d".to_string(), 45.5),
        ("loan_count_30d".to_string(), 2.0),
    ]))
}

/// A store with every resource injected; the filesystem is never read.
pub fn store() -> ResourceStore {
    store_with_dataset(dataset())
}

pub fn store_with_dataset(dataset: ReferenceDataset) -> ResourceStore {
    // RUST_LOG=debug shows operation timings while a test runs.
    let _ = env_logger::builder().is_test(true).try_init();
    ResourceStore::new(DashboardConfig::for_data_dir("/nonexistent"))
        .with_scorer(HintScorer::new())
        .with_dataset(dataset)
        .with_feature_map(feature_map())
        .with_medians(medians())
        .with_importance(importance())
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

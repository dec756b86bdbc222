mod common;

use delinquency_core::{
    config::DashboardConfig,
    dashboard,
    dataset::ReferenceDataset,
    dispatch::Dispatcher,
    error::ErrorKind,
    inference,
    resources::ResourceStore,
    types::FeatureRow,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn file_store() -> ResourceStore {
    ResourceStore::new(DashboardConfig::load(common::fixtures_dir()).unwrap())
}

// ── Config ───────────────────────────────────────────────────────────────────

/// Settings in dashboard.json override defaults; the rest keep theirs.
#[test]
fn config_file_overrides_selected_defaults() {
    let config = DashboardConfig::load(common::fixtures_dir()).unwrap();
    assert_eq!(config.explainer_background_rows, 5);
    assert_eq!(config.default_forecast_days, 14);
    assert_eq!(config.assumed_year, 2024);
    assert_eq!(config.model_file, "model.json");
    assert_eq!(config.data_dir, common::fixtures_dir());
    assert_eq!(config.model_path(), common::fixtures_dir().join("model.json"));
}

#[test]
fn missing_config_file_means_defaults() {
    let dir = common::fixtures_dir().parent().unwrap().to_path_buf();
    let config = DashboardConfig::load(&dir).unwrap();
    assert_eq!(config, DashboardConfig::for_data_dir(&dir));
    assert_eq!(config.default_forecast_days, 30);
    assert!(config.history_db.is_none());
}

#[test]
fn absolute_paths_are_not_rebased() {
    let config = DashboardConfig::for_data_dir("/data");
    assert_eq!(config.resolve("/elsewhere/model.json"), std::path::PathBuf::from("/elsewhere/model.json"));
    assert_eq!(config.resolve("model.json"), std::path::PathBuf::from("/data/model.json"));
}

// ── Loading ──────────────────────────────────────────────────────────────────

#[test]
fn csv_dataset_matches_the_in_memory_fixture() {
    let loaded = ReferenceDataset::load_csv(
        &common::fixtures_dir().join("telecom_clean.csv"),
        "loan_repaid_5days",
    )
    .unwrap();
    assert_eq!(loaded, common::dataset());
}

#[test]
fn csv_without_target_column_fails_to_load() {
    let err = ReferenceDataset::load_csv(&common::fixtures_dir().join("telecom_clean.csv"), "churned").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceLoad);
}

#[test]
fn missing_resource_files_are_load_errors() {
    let store = ResourceStore::new(DashboardConfig::for_data_dir("/nonexistent"));
    assert_eq!(store.dataset().unwrap_err().kind(), ErrorKind::ResourceLoad);
    assert_eq!(store.scorer().err().map(|e| e.kind()), Some(ErrorKind::ResourceLoad));
    assert_eq!(store.feature_map().unwrap_err().kind(), ErrorKind::ResourceLoad);
    assert_eq!(store.medians().unwrap_err().kind(), ErrorKind::ResourceLoad);
    assert_eq!(store.importance().unwrap_err().kind(), ErrorKind::ResourceLoad);
}

/// Each resource is read once; later calls return the same instance.
#[test]
fn resources_are_loaded_once() {
    let store = file_store();
    let a = store.dataset().unwrap() as *const ReferenceDataset;
    let b = store.dataset().unwrap() as *const ReferenceDataset;
    assert_eq!(a, b);
    assert_eq!(store.dataset().unwrap().len(), 8);
}

#[test]
fn lookup_tables_load_from_files() {
    let store = file_store();
    assert_eq!(store.feature_map().unwrap().display_name("score_hint"), "Score Hint");
    assert_eq!(store.feature_map().unwrap().display_name("unmapped"), "unmapped");
    assert_eq!(
        store.importance().unwrap().aligned(&["loan_count_30d".into(), "score_hint".into(), "x".into()]),
        vec![0.2, 0.8, 0.0]
    );
    assert_eq!(store.medians().unwrap().get("avg_daily_spend_90d"), Some(40.0));
}

// ── End to end over fixture files ────────────────────────────────────────────

/// The exported stump sends every score below 0.5 to Low and the rest to
/// High.
#[test]
fn overview_with_the_exported_model() {
    let out = dashboard::overview(&file_store()).unwrap();
    assert_eq!((out.risk_distribution.low, out.risk_distribution.medium, out.risk_distribution.high), (4, 0, 4));
    assert_eq!(out.at_risk_percentage, 50.0);
}

#[test]
fn explainer_background_is_capped_by_config() {
    let store = file_store();
    let mut row = FeatureRow::new();
    row.set("score_hint", 0.9);
    row.set("loan_count_30d", 1.0);

    let out = inference::explain_prediction(&store, &row).unwrap();
    assert_eq!(out.explanations.len(), 2);
    assert_eq!(out.explanations[0].feature, "score_hint");
    assert!(out.explanations[0].contribution >= 0.0);
    assert_eq!(out.explanations[1].contribution, 0.0);
}

/// A `null` feature reaches the model as a missing value and follows the
/// split's default branch (left, leaf -2).
#[test]
fn null_feature_follows_the_default_branch() {
    let dispatcher = Dispatcher::new(file_store());
    let response = dispatcher.handle(Some("predict_single"), Some(r#"{"score_hint": null, "loan_count_30d": 1}"#));
    assert!(response.is_success());
    assert_eq!(response.body["prediction"], 0);
    let p = response.body["probability_class_1"].as_f64().unwrap();
    assert!(common::approx(p, 1.0 / (1.0 + 2.0_f64.exp())));

    let response = dispatcher.handle(Some("explain_prediction"), Some(r#"{"score_hint": "", "loan_count_30d": 1}"#));
    assert!(response.is_success());
}

#[test]
fn dispatcher_over_fixture_files() {
    let dispatcher = Dispatcher::new(file_store());
    let response = dispatcher.handle(Some("forecast"), None);
    assert!(response.is_success());
    assert_eq!(response.body["summary"]["forecast_period_days"], 14);

    let response = dispatcher.handle(Some("dataset_stats"), None);
    assert_eq!(response.body["stats"]["total_records"], 8);
}

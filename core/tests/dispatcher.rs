mod common;

use delinquency_core::{
    command::{Command, COMMAND_NAMES},
    config::DashboardConfig,
    dispatch::{success_envelope, Dispatcher},
    error::DashResult,
    model::Scorer,
    resources::ResourceStore,
    store::HistoryStore,
    types::FeatureName,
};
use serde_json::{json, Value};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn dispatcher() -> Dispatcher {
    Dispatcher::new(common::store())
}

fn with_history() -> Dispatcher {
    let history = HistoryStore::in_memory().unwrap();
    history.migrate().unwrap();
    dispatcher().with_history(history)
}

const CUSTOMER: &str = r#"{"score_hint": 0.8, "loan_count_30d": 2}"#;

/// Scores on the derived 30-day loan frequency, so engineered inputs can be
/// scored without a model file.
struct FrequencyScorer {
    names: Vec<FeatureName>,
}

impl Scorer for FrequencyScorer {
    fn feature_names(&self) -> &[FeatureName] {
        &self.names
    }

    fn predict_proba(&self, rows: &[Vec<f64>]) -> DashResult<Vec<f64>> {
        Ok(rows.iter().map(|r| r[1]).collect())
    }
}

fn engineering_dispatcher() -> Dispatcher {
    let store = ResourceStore::new(DashboardConfig::for_data_dir("/nonexistent"))
        .with_scorer(FrequencyScorer {
            names: vec!["loan_count_30d".into(), "loan_frequency_30d".into()],
        })
        .with_feature_map(common::feature_map())
        .with_medians(common::medians())
        .with_importance(common::importance());
    let history = HistoryStore::in_memory().unwrap();
    history.migrate().unwrap();
    Dispatcher::new(store).with_history(history)
}

// ── Envelope ─────────────────────────────────────────────────────────────────

/// `success` leads the envelope and the payload keys follow at top level.
#[test]
fn success_envelope_flattens_payload() {
    let response = dispatcher().handle(Some("overview"), None);
    assert!(response.is_success());
    assert_eq!(response.exit_code, 0);

    let keys: Vec<&str> = response.body.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys[0], "success");
    assert_eq!(response.body["total_customers"], 8);
    assert_eq!(response.body["delinquency_rate"], 50.0);
}

#[test]
fn non_object_payload_goes_under_data() {
    assert_eq!(success_envelope(json!([1, 2])), json!({"success": true, "data": [1, 2]}));
}

#[test]
fn unknown_command_exits_one() {
    let response = dispatcher().handle(Some("frobnicate"), None);
    assert_eq!(response.exit_code, 1);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["kind"], "input");
    assert_eq!(response.body["error"], "Unknown command: frobnicate");
}

#[test]
fn missing_command_exits_one() {
    let response = dispatcher().handle(None, None);
    assert_eq!(response.exit_code, 1);
    assert_eq!(response.body["error"], "No command provided");
}

#[test]
fn missing_or_malformed_argument_is_an_input_error() {
    for (cmd, arg) in [
        ("predict", None),
        ("predict_single", Some("{not json")),
        ("predict_batch", Some(r#"{"score_hint": 1}"#)),
        ("single", Some(r#"{"loan_count_30d": "many"}"#)),
        ("explain_prediction", Some("[]")),
    ] {
        let response = dispatcher().handle(Some(cmd), arg);
        assert_eq!(response.exit_code, 1, "{cmd} {arg:?}");
        assert_eq!(response.body["kind"], "input", "{cmd} {arg:?}");
    }
}

/// Failures past parsing are reported in the envelope with exit code 0.
#[test]
fn computation_and_resource_failures_exit_zero() {
    let response = dispatcher().handle(Some("predict_single"), Some(r#"{"score_hint": 0.3}"#));
    assert_eq!(response.exit_code, 0);
    assert_eq!(response.body["kind"], "computation");
    assert_eq!(response.body["error"], "Missing feature 'loan_count_30d'");

    let bare = Dispatcher::new(ResourceStore::new(DashboardConfig::for_data_dir("/nonexistent")));
    let response = bare.handle(Some("overview"), None);
    assert_eq!(response.exit_code, 0);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["kind"], "resource_load");
}

// ── Commands ─────────────────────────────────────────────────────────────────

#[test]
fn every_command_name_parses() {
    for name in COMMAND_NAMES {
        let cmd = Command::parse(name, Some("[]"), 30)
            .or_else(|_| Command::parse(name, Some("{}"), 30))
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(cmd.name(), *name);
    }
}

#[test]
fn forecast_horizon_falls_back_to_default() {
    assert_eq!(Command::parse("forecast", None, 30).unwrap(), Command::Forecast { periods: 30 });
    assert_eq!(Command::parse("forecast", Some("abc"), 30).unwrap(), Command::Forecast { periods: 30 });
    assert_eq!(Command::parse("forecast", Some("-4"), 30).unwrap(), Command::Forecast { periods: 30 });
    assert_eq!(Command::parse("forecast", Some("7"), 30).unwrap(), Command::Forecast { periods: 7 });
}

#[test]
fn forecast_uses_configured_default_horizon() {
    let response = dispatcher().handle(Some("forecast"), Some("soon"));
    assert!(response.is_success());
    assert_eq!(response.body["summary"]["forecast_period_days"], 30);
    assert_eq!(response.body["forecast"].as_array().unwrap().len(), 30);
}

#[test]
fn schema_needs_no_resources() {
    let bare = Dispatcher::new(ResourceStore::new(DashboardConfig::for_data_dir("/nonexistent")));
    let response = bare.handle(Some("schema"), None);
    assert!(response.is_success());
    assert_eq!(response.body["base_inputs"].as_object().unwrap().len(), 34);
}

#[test]
fn single_and_batch_engineer_features() {
    let response = dispatcher().handle(Some("single"), Some(r#"{"loan_count_30d": 9}"#));
    assert!(response.is_success());
    assert_eq!(response.body["derived_features"]["loan_frequency_30d"], 0.3);

    let response = dispatcher().handle(Some("batch"), Some(r#"[{"loan_count_30d": 9}, {}]"#));
    assert!(response.is_success());
    assert_eq!(response.body["rows_processed"], 2);
    assert_eq!(response.body["data"][1]["sim_age_days"], 540.0);
}

#[test]
fn predict_returns_risk_level() {
    let response = dispatcher().handle(Some("predict"), Some(CUSTOMER));
    assert!(response.is_success());
    assert_eq!(response.body["risk_level"], "High");
    assert_eq!(response.body["top_factors"][0]["feature"], "score_hint");
}

/// Raw base inputs are filled, derived and scored in one command.
#[test]
fn single_predict_engineers_then_scores() {
    let d = engineering_dispatcher();
    let response = d.handle(Some("single_predict"), Some(r#"{"loan_count_30d": 24}"#));
    assert!(response.is_success());
    assert_eq!(response.body["base_inputs"], json!({"loan_count_30d": 24.0}));
    assert!(common::approx(response.body["derived_features"]["loan_frequency_30d"].as_f64().unwrap(), 0.8));
    assert_eq!(response.body["prediction"]["prediction"], 1);
    assert_eq!(response.body["prediction"]["risk_level"], "High");
    assert!(response.body.get("features").is_none());

    // Median fill: 2 loans over 30 days.
    let response = d.handle(Some("single_predict"), Some("{}"));
    assert_eq!(response.body["prediction"]["risk_level"], "Low");
    assert!(common::approx(response.body["prediction"]["probability"].as_f64().unwrap(), 2.0 / 30.0));

    let history = d.handle(Some("history"), None);
    assert_eq!(history.body["count"], 2);
    assert_eq!(history.body["predictions"][1]["input_data"]["loan_count_30d"], 24.0);
}

#[test]
fn single_predict_requires_an_object() {
    let response = engineering_dispatcher().handle(Some("single_predict"), Some("[1]"));
    assert_eq!(response.exit_code, 1);
    assert_eq!(response.body["kind"], "input");
}

// ── History ──────────────────────────────────────────────────────────────────

#[test]
fn history_without_database_is_a_resource_error() {
    let response = dispatcher().handle(Some("history"), None);
    assert_eq!(response.exit_code, 0);
    assert_eq!(response.body["kind"], "resource_load");
}

#[test]
fn predictions_are_recorded_newest_first() {
    let d = with_history();
    assert!(d.handle(Some("predict_single"), Some(CUSTOMER)).is_success());
    assert!(d
        .handle(
            Some("predict_batch"),
            Some(r#"[{"score_hint": 0.1, "loan_count_30d": 0}, {"score_hint": 0.9, "loan_count_30d": 1}]"#),
        )
        .is_success());
    assert!(d.handle(Some("predict"), Some(CUSTOMER)).is_success());

    let response = d.handle(Some("history"), None);
    assert!(response.is_success());
    assert_eq!(response.body["count"], 4);

    let types: Vec<&str> = response.body["predictions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["prediction_type"].as_str().unwrap())
        .collect();
    assert_eq!(types, ["single", "batch", "batch", "single"]);
    assert_eq!(response.body["predictions"][3]["input_data"]["score_hint"], 0.8);
}

#[test]
fn history_limit_caps_rows() {
    let d = with_history();
    for _ in 0..3 {
        d.handle(Some("predict_single"), Some(CUSTOMER));
    }
    let response = d.handle(Some("history"), Some("2"));
    assert_eq!(response.body["count"], 2);

    let response = d.handle(Some("history"), Some("lots"));
    assert_eq!(response.body["count"], 3);
}

/// A failed prediction leaves no history row.
#[test]
fn failed_predictions_are_not_recorded() {
    let d = with_history();
    d.handle(Some("predict_single"), Some(r#"{"score_hint": 0.3}"#));
    let response = d.handle(Some("history"), None);
    assert_eq!(response.body["count"], 0);
    assert_eq!(response.body["predictions"], Value::Array(vec![]));
}

//! Command dispatcher: one command in, one JSON envelope out.
//!
//! Success:  `{"success": true, ...payload}`
//! Failure:  `{"success": false, "error": "<message>", "kind": "<kind>"}`
//!
//! Nothing below this layer builds envelopes, and nothing above it sees a
//! raw `DashError`.

use crate::{
    command::Command,
    dashboard,
    error::{DashError, DashResult, ErrorKind},
    features::{engineer, engineer_batch},
    inference,
    resources::ResourceStore,
    schema::field_catalog,
    store::{HistoryStore, PredictionRecord, PredictionType},
    trends,
    types::FeatureRow,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::time::Instant;

/// A finished invocation: the envelope to print and the process exit code.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub body:      Value,
    pub exit_code: i32,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.body["success"] == Value::Bool(true)
    }
}

pub struct Dispatcher {
    store:   ResourceStore,
    history: Option<HistoryStore>,
}

#[derive(Serialize)]
struct EngineeredBatch {
    data:           Vec<FeatureRow>,
    rows_processed: usize,
}

#[derive(Serialize)]
struct HistoryPage {
    count:       usize,
    predictions: Vec<PredictionRecord>,
}

impl Dispatcher {
    pub fn new(store: ResourceStore) -> Self {
        Self { store, history: None }
    }

    /// Record predictions into `history` and enable the `history` command.
    pub fn with_history(mut self, history: HistoryStore) -> Self {
        self.history = Some(history);
        self
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    /// Parse, run and wrap. Input errors (no command, unknown command, bad
    /// argument) exit 1; everything else exits 0.
    pub fn handle(&self, token: Option<&str>, arg: Option<&str>) -> Response {
        let result = token
            .ok_or_else(|| DashError::input("No command provided"))
            .and_then(|t| Command::parse(t, arg, self.store.config().default_forecast_days))
            .and_then(|cmd| self.execute(&cmd));

        match result {
            Ok(payload) => Response { body: success_envelope(payload), exit_code: 0 },
            Err(e) => {
                let exit_code = if e.kind() == ErrorKind::Input { 1 } else { 0 };
                log::debug!("command failed ({:?}): {e}", e.kind());
                Response { body: failure_envelope(&e), exit_code }
            }
        }
    }

    /// Run one parsed command and return its payload (no envelope).
    pub fn execute(&self, cmd: &Command) -> DashResult<Value> {
        let started = Instant::now();
        let store = &self.store;

        let payload = match cmd {
            Command::Overview         => to_payload(&dashboard::overview(store)?)?,
            Command::Behaviour        => to_payload(&dashboard::behaviour(store)?)?,
            Command::Portfolio        => to_payload(&dashboard::portfolio(store)?)?,
            Command::Performance      => to_payload(&dashboard::performance(store)?)?,
            Command::AdvancedPatterns => to_payload(&dashboard::advanced_patterns(store)?)?,
            Command::Predict(record)  => {
                let risk = dashboard::predict_risk(store, record)?;
                self.record_single(record, risk.prediction, risk.probability);
                to_payload(&risk)?
            }
            Command::SinglePredict(input) => {
                let result = dashboard::predict_from_inputs(store, input)?;
                self.record_single(&result.features, result.prediction.prediction, result.prediction.probability);
                to_payload(&result)?
            }

            Command::Schema          => to_payload(&field_catalog())?,
            Command::Single(input)   => to_payload(&engineer(input, store.medians()?))?,
            Command::Batch(inputs)   => {
                let data = engineer_batch(inputs, store.medians()?);
                to_payload(&EngineeredBatch { rows_processed: data.len(), data })?
            }

            Command::Forecast { periods } => to_payload(&trends::forecast(store, *periods)?)?,
            Command::Statistics           => to_payload(&trends::statistics(store)?)?,

            Command::PredictSingle(record) => {
                let result = inference::predict_single(store, record)?;
                self.record_single(record, result.prediction, result.probability_class_1);
                to_payload(&result)?
            }
            Command::PredictBatch(records) => {
                let batch = inference::predict_batch(store, records)?;
                self.record_batch(records, &batch);
                to_payload(&batch)?
            }
            Command::FeatureImportance      => to_payload(&inference::feature_importance(store)?)?,
            Command::ModelMetrics           => to_payload(&inference::model_metrics(store)?)?,
            Command::DatasetStats           => to_payload(&inference::dataset_stats(store)?)?,
            Command::ExplainPrediction(rec) => to_payload(&inference::explain_prediction(store, rec)?)?,

            Command::History { limit } => {
                let history = self.history.as_ref().ok_or_else(|| {
                    DashError::resource("history", "no history database configured (set history_db or pass --history-db)")
                })?;
                let predictions = history.recent(*limit)?;
                to_payload(&HistoryPage { count: predictions.len(), predictions })?
            }
        };

        log::debug!("{} completed in {:?}", cmd.name(), started.elapsed());
        Ok(payload)
    }

    // ── History ────────────────────────────────────────────────
    //
    // A history write failure never fails the prediction that caused it.

    fn record_single(&self, record: &FeatureRow, prediction: u8, probability: f64) {
        let Some(history) = &self.history else { return };
        let outcome = serde_json::to_value(record)
            .map_err(DashError::from)
            .and_then(|input| history.record(PredictionType::Single, &input, prediction, probability));
        if let Err(e) = outcome {
            log::warn!("prediction not recorded in history: {e}");
        }
    }

    fn record_batch(&self, records: &[FeatureRow], batch: &inference::BatchPredictions) {
        let Some(history) = &self.history else { return };
        let outcome = records
            .iter()
            .zip(&batch.results)
            .map(|(record, r)| -> DashResult<(Value, u8, f64)> {
                Ok((
                    serde_json::to_value(record)?,
                    r.probabilities.prediction,
                    r.probabilities.probability_class_1,
                ))
            })
            .collect::<DashResult<Vec<_>>>()
            .and_then(|rows| history.record_batch(&rows));
        if let Err(e) = outcome {
            log::warn!("batch not recorded in history: {e}");
        }
    }
}

fn to_payload<T: Serialize>(value: &T) -> DashResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// `success: true` first, then the payload's own keys. A payload that is
/// not a JSON object is placed under `data`.
pub fn success_envelope(payload: Value) -> Value {
    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(true));
    match payload {
        Value::Object(fields) => body.extend(fields),
        other => {
            body.insert("data".into(), other);
        }
    }
    Value::Object(body)
}

pub fn failure_envelope(error: &DashError) -> Value {
    json!({
        "success": false,
        "error":   error.to_string(),
        "kind":    error.kind(),
    })
}

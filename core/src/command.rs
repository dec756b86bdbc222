use crate::{
    error::{DashError, DashResult},
    types::{FeatureRow, PartialRecord},
};
use serde_json::Value;

/// Rows returned by `history` when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// Every command token the dispatcher accepts.
pub const COMMAND_NAMES: &[&str] = &[
    // ── Dashboard ─────────────────────────────────
    "overview",
    "behaviour",
    "portfolio",
    "performance",
    "predict",
    "single_predict",
    "advanced_patterns",
    // ── Feature engineering ───────────────────────
    "schema",
    "single",
    "batch",
    // ── Forecasting ───────────────────────────────
    "forecast",
    "statistics",
    // ── Model service ─────────────────────────────
    "predict_single",
    "predict_batch",
    "feature_importance",
    "model_metrics",
    "dataset_stats",
    "explain_prediction",
    // ── History ───────────────────────────────────
    "history",
];

/// A parsed command with its argument already decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Overview,
    Behaviour,
    Portfolio,
    Performance,
    Predict(FeatureRow),
    SinglePredict(PartialRecord),
    AdvancedPatterns,

    Schema,
    Single(PartialRecord),
    Batch(Vec<PartialRecord>),

    Forecast { periods: u32 },
    Statistics,

    PredictSingle(FeatureRow),
    PredictBatch(Vec<FeatureRow>),
    FeatureImportance,
    ModelMetrics,
    DatasetStats,
    ExplainPrediction(FeatureRow),

    History { limit: u32 },
}

impl Command {
    /// Decode `token` and its optional argument. `default_periods` applies
    /// when `forecast` has no usable horizon.
    pub fn parse(token: &str, arg: Option<&str>, default_periods: u32) -> DashResult<Self> {
        let cmd = match token {
            "overview"           => Self::Overview,
            "behaviour"          => Self::Behaviour,
            "portfolio"          => Self::Portfolio,
            "performance"        => Self::Performance,
            "predict"            => Self::Predict(FeatureRow::from_json(&required_json(token, arg)?)?),
            "single_predict"     => Self::SinglePredict(PartialRecord::from_json(&required_json(token, arg)?)?),
            "advanced_patterns"  => Self::AdvancedPatterns,

            "schema"             => Self::Schema,
            "single"             => Self::Single(PartialRecord::from_json(&required_json(token, arg)?)?),
            "batch"              => Self::Batch(
                json_array(&required_json(token, arg)?)?
                    .iter()
                    .map(PartialRecord::from_json)
                    .collect::<DashResult<_>>()?,
            ),

            "forecast"           => Self::Forecast {
                periods: lenient_count(arg, default_periods),
            },
            "statistics"         => Self::Statistics,

            "predict_single"     => Self::PredictSingle(FeatureRow::from_json(&required_json(token, arg)?)?),
            "predict_batch"      => Self::PredictBatch(
                json_array(&required_json(token, arg)?)?
                    .iter()
                    .map(FeatureRow::from_json)
                    .collect::<DashResult<_>>()?,
            ),
            "feature_importance" => Self::FeatureImportance,
            "model_metrics"      => Self::ModelMetrics,
            "dataset_stats"      => Self::DatasetStats,
            "explain_prediction" => Self::ExplainPrediction(FeatureRow::from_json(&required_json(token, arg)?)?),

            "history"            => Self::History {
                limit: lenient_count(arg, DEFAULT_HISTORY_LIMIT),
            },

            other => return Err(DashError::UnknownCommand(other.to_string())),
        };
        Ok(cmd)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Overview             => "overview",
            Self::Behaviour            => "behaviour",
            Self::Portfolio            => "portfolio",
            Self::Performance          => "performance",
            Self::Predict(_)           => "predict",
            Self::SinglePredict(_)     => "single_predict",
            Self::AdvancedPatterns     => "advanced_patterns",
            Self::Schema               => "schema",
            Self::Single(_)            => "single",
            Self::Batch(_)             => "batch",
            Self::Forecast { .. }      => "forecast",
            Self::Statistics           => "statistics",
            Self::PredictSingle(_)     => "predict_single",
            Self::PredictBatch(_)      => "predict_batch",
            Self::FeatureImportance    => "feature_importance",
            Self::ModelMetrics         => "model_metrics",
            Self::DatasetStats         => "dataset_stats",
            Self::ExplainPrediction(_) => "explain_prediction",
            Self::History { .. }       => "history",
        }
    }
}

fn required_json(token: &str, arg: Option<&str>) -> DashResult<Value> {
    let raw = arg.ok_or_else(|| DashError::input(format!("'{token}' requires a JSON argument")))?;
    serde_json::from_str(raw)
        .map_err(|e| DashError::input(format!("Malformed JSON argument for '{token}': {e}")))
}

fn json_array(value: &Value) -> DashResult<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| DashError::input("Expected a JSON array of records"))
}

/// A non-negative integer argument; anything unparsable means `default`.
fn lenient_count(arg: Option<&str>, default: u32) -> u32 {
    arg.and_then(|a| a.trim().parse().ok()).unwrap_or(default)
}

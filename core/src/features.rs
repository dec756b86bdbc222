//! Feature derivation: imputation of base inputs and the derived ratios.
//!
//! RULES:
//!   - Every base input resolves as: caller value → median → 0.
//!   - Derived features are always recomputed, never taken from the caller.
//!   - Nothing in this module fails; malformed values are rejected when the
//!     partial record is parsed.

use crate::{
    schema::{is_base_input, BASE_INPUTS, DERIVED_FEATURES},
    types::{FeatureRow, PartialRecord},
};
use serde::Serialize;
use std::collections::HashMap;

/// Historical medians used as fallbacks, keyed by base-input name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedianTable {
    values: HashMap<String, f64>,
}

impl MedianTable {
    pub fn new(values: HashMap<String, f64>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolve every base input in canonical order. The result holds exactly
/// the base inputs and nothing else.
pub fn fill_missing(input: &PartialRecord, medians: &MedianTable) -> FeatureRow {
    let mut filled = FeatureRow::with_capacity(BASE_INPUTS.len());
    for (name, _) in BASE_INPUTS {
        let value = input
            .value(name)
            .or_else(|| medians.get(name))
            .unwrap_or(0.0);
        filled.set(name, value);
    }
    filled
}

/// Append the derived features to a filled record.
///
/// The recharge/loan ratios require both operands to be positive while the
/// trends only guard the denominator.
pub fn derive(filled: &FeatureRow) -> FeatureRow {
    let mut features = filled.clone();
    let v = |name: &str| filled.get_or_zero(name);

    for window in ["30d", "90d"] {
        let recharge = v(&format!("total_main_recharge_amt_{window}"));
        let loan = v(&format!("total_loan_amt_{window}"));
        let ratio = if recharge > 0.0 && loan > 0.0 {
            recharge / (loan + 1.0)
        } else {
            0.0
        };
        features.set(&format!("recharge_to_loan_ratio_{window}"), ratio);
    }

    features.set(
        "spending_trend_30_90",
        trend(v("avg_daily_spend_30d"), v("avg_daily_spend_90d")),
    );
    features.set(
        "balance_trend_30_90",
        trend(v("avg_main_balance_30d"), v("avg_main_balance_90d")),
    );

    features.set("loan_frequency_30d", v("loan_count_30d") / 30.0);
    features.set("loan_frequency_90d", v("loan_count_90d") / 90.0);

    features
}

fn trend(recent: f64, baseline: f64) -> f64 {
    if baseline > 0.0 {
        (recent - baseline) / (baseline + 1.0)
    } else {
        0.0
    }
}

/// The `single` payload.
#[derive(Debug, Clone, Serialize)]
pub struct EngineeredFeatures {
    pub features:         FeatureRow,
    /// Caller-supplied base inputs, as given (absent values are `null`).
    pub base_inputs:      PartialRecord,
    pub derived_features: FeatureRow,
}

pub fn engineer(input: &PartialRecord, medians: &MedianTable) -> EngineeredFeatures {
    let features = derive(&fill_missing(input, medians));

    let mut base_inputs = PartialRecord::new();
    for (name, value) in input.iter().filter(|(name, _)| is_base_input(name)) {
        base_inputs.insert(name, value);
    }

    let derived_features = DERIVED_FEATURES
        .iter()
        .map(|(name, _)| (name.to_string(), features.get_or_zero(name)))
        .collect();

    EngineeredFeatures {
        features,
        base_inputs,
        derived_features,
    }
}

/// Engineer many records; one output row per input row.
pub fn engineer_batch(inputs: &[PartialRecord], medians: &MedianTable) -> Vec<FeatureRow> {
    inputs
        .iter()
        .map(|input| derive(&fill_missing(input, medians)))
        .collect()
}

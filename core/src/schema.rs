//! Field catalogs: the fixed base-input and derived-feature sets.
//!
//! RULE: Order is part of the contract. Entries are never reordered;
//! the model export and the engineered rows both follow this order.

use serde::Serialize;

pub const BASE_INPUTS: &[(&str, &str)] = &[
    ("sim_age_days",                      "SIM Age (Days)"),
    ("date_month",                        "Current Month (1-12)"),
    ("date_day",                          "Current Day (1-31)"),
    ("avg_daily_spend_30d",               "Avg Daily Spend (30d)"),
    ("avg_daily_spend_90d",               "Avg Daily Spend (90d)"),
    ("avg_main_balance_30d",              "Avg Main Balance (30d)"),
    ("avg_main_balance_90d",              "Avg Main Balance (90d)"),
    ("main_recharge_count_30d",           "Main Recharge Count (30d)"),
    ("main_recharge_count_90d",           "Main Recharge Count (90d)"),
    ("main_recharge_frequency_30d",       "Main Recharge Frequency (30d)"),
    ("main_recharge_frequency_90d",       "Main Recharge Frequency (90d)"),
    ("total_main_recharge_amt_30d",       "Total Main Recharge Amount (30d)"),
    ("total_main_recharge_amt_90d",       "Total Main Recharge Amount (90d)"),
    ("median_main_recharge_amt_30d",      "Median Main Recharge Amount (30d)"),
    ("median_main_recharge_amt_90d",      "Median Main Recharge Amount (90d)"),
    ("data_recharge_count_30d",           "Data Recharge Count (30d)"),
    ("data_recharge_count_90d",           "Data Recharge Count (90d)"),
    ("data_recharge_frequency_30d",       "Data Recharge Frequency (30d)"),
    ("data_recharge_frequency_90d",       "Data Recharge Frequency (90d)"),
    ("loan_count_30d",                    "Loan Count (30d)"),
    ("loan_count_90d",                    "Loan Count (90d)"),
    ("total_loan_amt_30d",                "Total Loan Amount (30d)"),
    ("total_loan_amt_90d",                "Total Loan Amount (90d)"),
    ("max_loan_amt_30d",                  "Max Loan Amount (30d)"),
    ("max_loan_amt_90d",                  "Max Loan Amount (90d)"),
    ("median_loan_amt_30d_loans30",       "Median Loan Amount (30d)"),
    ("median_loan_amt_90d",               "Median Loan Amount (90d)"),
    ("avg_payback_time_30d",              "Avg Payback Time (30d)"),
    ("avg_payback_time_90d",              "Avg Payback Time (90d)"),
    ("last_rech_date_ma",                 "Last Recharge Date (Month)"),
    ("last_rech_date_da",                 "Last Recharge Date (Day)"),
    ("last_rech_amt_ma",                  "Last Recharge Amount"),
    ("median_prebal_before_recharge_30d", "Median Pre-Balance Before Recharge (30d)"),
    ("median_main_prebal_90d",            "Median Main Pre-Balance (90d)"),
];

pub const DERIVED_FEATURES: &[(&str, &str)] = &[
    ("recharge_to_loan_ratio_30d", "Recharge to Loan Ratio (30d)"),
    ("recharge_to_loan_ratio_90d", "Recharge to Loan Ratio (90d)"),
    ("spending_trend_30_90",       "Spending Trend (30d vs 90d)"),
    ("balance_trend_30_90",        "Balance Trend (30d vs 90d)"),
    ("loan_frequency_30d",         "Loan Frequency (30d)"),
    ("loan_frequency_90d",         "Loan Frequency (90d)"),
];

const CATALOG_DESCRIPTION: &str =
    "User provides base inputs; derived features are calculated automatically";

pub fn is_base_input(name: &str) -> bool {
    BASE_INPUTS.iter().any(|(k, _)| *k == name)
}

pub fn is_derived_feature(name: &str) -> bool {
    DERIVED_FEATURES.iter().any(|(k, _)| *k == name)
}

/// Base inputs followed by derived features, the order engineered rows use.
pub fn all_feature_names() -> impl Iterator<Item = &'static str> {
    BASE_INPUTS
        .iter()
        .chain(DERIVED_FEATURES.iter())
        .map(|(name, _)| *name)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCatalog {
    pub base_inputs:      serde_json::Map<String, serde_json::Value>,
    pub derived_features: serde_json::Map<String, serde_json::Value>,
    pub description:      &'static str,
}

/// The `schema` payload. Pure; identical on every call.
pub fn field_catalog() -> FieldCatalog {
    FieldCatalog {
        base_inputs:      label_map(BASE_INPUTS),
        derived_features: label_map(DERIVED_FEATURES),
        description:      CATALOG_DESCRIPTION,
    }
}

fn label_map(fields: &[(&str, &str)]) -> serde_json::Map<String, serde_json::Value> {
    fields
        .iter()
        .map(|(name, label)| (name.to_string(), serde_json::Value::from(*label)))
        .collect()
}

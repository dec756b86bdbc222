//! Shared record types used across the whole crate.

use crate::error::{DashError, DashResult};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// A feature name as it appears in the dataset header and model export.
pub type FeatureName = String;

/// Column holding the repayment label in the reference dataset.
pub const DEFAULT_TARGET_COLUMN: &str = "loan_repaid_5days";

/// An ordered feature name → value record.
///
/// Order is significant: it is the order the fields were inserted in,
/// which for engineered rows is the canonical base-then-derived order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    fields: Vec<(FeatureName, f64)>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self { fields: Vec::with_capacity(n) }
    }

    /// Insert or overwrite a field. Overwriting keeps the original position.
    pub fn set(&mut self, name: &str, value: f64) {
        match self.fields.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| *v)
    }

    /// Value of `name`, or 0 when absent.
    pub fn get_or_zero(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Restrict and reorder to `expected`. A missing column is an error.
    pub fn align(&self, expected: &[FeatureName]) -> DashResult<Vec<f64>> {
        expected
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| DashError::MissingFeature { name: name.clone() })
            })
            .collect()
    }

    /// Parse a flat JSON object of numbers. `null` and `""` become NaN, a
    /// missing value the model routes on its own; other non-numeric values
    /// are rejected.
    pub fn from_json(value: &Value) -> DashResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| DashError::input("Expected a JSON object of feature values"))?;
        let mut row = Self::with_capacity(obj.len());
        for (name, v) in obj {
            row.set(name, numeric_value(v)?.unwrap_or(f64::NAN));
        }
        Ok(row)
    }
}

impl FromIterator<(FeatureName, f64)> for FeatureRow {
    fn from_iter<I: IntoIterator<Item = (FeatureName, f64)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (k, v) in iter {
            row.set(&k, v);
        }
        row
    }
}

impl Serialize for FeatureRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Caller-supplied inputs before imputation. `None` marks an absent value
/// (JSON `null` or an empty string).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRecord {
    fields: Vec<(FeatureName, Option<f64>)>,
}

impl PartialRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.insert(name, Some(value));
        self
    }

    pub fn with_absent(mut self, name: &str) -> Self {
        self.insert(name, None);
        self
    }

    pub fn insert(&mut self, name: &str, value: Option<f64>) {
        match self.fields.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// The caller's value for `name`, if one was supplied and is not empty.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn from_json(value: &Value) -> DashResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| DashError::input("Expected a JSON object of base inputs"))?;
        let mut record = Self::new();
        for (name, v) in obj {
            record.insert(name, numeric_value(v)?);
        }
        Ok(record)
    }
}

impl Serialize for PartialRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Numbers pass through, numeric strings are parsed, `null` and `""` are
/// absent. Everything else is an input error.
fn numeric_value(v: &Value) -> DashResult<Option<f64>> {
    match v {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| DashError::input(format!("Unrepresentable number {n}"))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| DashError::input(format!("'{s}' is not a number"))),
        other => Err(DashError::input(format!("Unsupported value {other}"))),
    }
}

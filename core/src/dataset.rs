//! The reference dataset: the historical table every aggregate reads.
//!
//! Immutable once loaded. Operations that need derived columns copy the
//! column out (`column()` returns an owned Vec) instead of appending to
//! the table.

use crate::{
    error::{DashError, DashResult},
    rng::SampleRng,
    types::{FeatureName, FeatureRow},
};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDataset {
    columns: Vec<FeatureName>,
    rows:    Vec<Vec<f64>>,
    target:  usize,
}

impl ReferenceDataset {
    /// Build from in-memory columns and rows (fixtures, tests).
    pub fn new(columns: Vec<FeatureName>, rows: Vec<Vec<f64>>, target_column: &str) -> DashResult<Self> {
        let target = columns
            .iter()
            .position(|c| c == target_column)
            .ok_or_else(|| {
                DashError::computation(format!("Dataset has no target column '{target_column}'"))
            })?;
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(DashError::computation(format!(
                "Dataset row {i} has {} values, expected {}",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows, target })
    }

    /// Load a headered, all-numeric CSV. Empty cells load as NaN.
    pub fn load_csv(path: &Path, target_column: &str) -> DashResult<Self> {
        let shown = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| DashError::resource(&shown, e))?;

        let columns: Vec<FeatureName> = reader
            .headers()
            .map_err(|e| DashError::resource(&shown, e))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| DashError::resource(&shown, e))?;
            let row = record
                .iter()
                .enumerate()
                .map(|(col, cell)| parse_cell(cell).ok_or_else(|| {
                    DashError::resource(
                        &shown,
                        format!("row {}: column '{}' is not numeric: '{cell}'", line + 1, columns[col]),
                    )
                }))
                .collect::<DashResult<Vec<f64>>>()?;
            rows.push(row);
        }

        Self::new(columns, rows, target_column).map_err(|e| DashError::resource(&shown, e))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[FeatureName] {
        &self.columns
    }

    pub fn target_column(&self) -> &str {
        &self.columns[self.target]
    }

    /// Every column except the target, in file order.
    pub fn feature_columns(&self) -> Vec<FeatureName> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.target)
            .map(|(_, c)| c.clone())
            .collect()
    }

    fn index_of(&self, name: &str) -> DashResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DashError::computation(format!("Dataset has no column '{name}'")))
    }

    /// An owned copy of one column.
    pub fn column(&self, name: &str) -> DashResult<Vec<f64>> {
        let idx = self.index_of(name)?;
        Ok(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// Target labels as 0/1. Any other value is a computation error.
    pub fn labels(&self) -> DashResult<Vec<u8>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, r)| match r[self.target] {
                v if v == 0.0 => Ok(0),
                v if v == 1.0 => Ok(1),
                v => Err(DashError::computation(format!(
                    "Row {i}: label {v} is not 0 or 1"
                ))),
            })
            .collect()
    }

    /// Feature matrix restricted and reordered to `expected`, target dropped.
    pub fn feature_matrix(&self, expected: &[FeatureName]) -> DashResult<Vec<Vec<f64>>> {
        let indices = expected
            .iter()
            .map(|name| {
                if name == self.target_column() {
                    return Err(DashError::computation(format!(
                        "Target column '{name}' cannot be a model feature"
                    )));
                }
                self.columns
                    .iter()
                    .position(|c| c == name)
                    .ok_or_else(|| DashError::MissingFeature { name: name.clone() })
            })
            .collect::<DashResult<Vec<usize>>>()?;

        Ok(self
            .rows
            .iter()
            .map(|r| indices.iter().map(|&i| r[i]).collect())
            .collect())
    }

    /// One row as a named record, target excluded.
    pub fn feature_row(&self, index: usize) -> Option<FeatureRow> {
        let row = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .zip(row)
                .enumerate()
                .filter(|(i, _)| *i != self.target)
                .map(|(_, (c, v))| (c.clone(), *v))
                .collect(),
        )
    }

    /// Deterministic sample of at most `k` rows (feature matrix form).
    pub fn sample_matrix(&self, expected: &[FeatureName], k: usize, seed: u64) -> DashResult<Vec<Vec<f64>>> {
        let matrix = self.feature_matrix(expected)?;
        let picked = SampleRng::new(seed).sample_indices(matrix.len(), k);
        Ok(picked.into_iter().map(|i| matrix[i].clone()).collect())
    }
}

fn parse_cell(cell: &str) -> Option<f64> {
    if cell.is_empty() {
        return Some(f64::NAN);
    }
    cell.parse::<f64>().ok()
}

//! Resource store: model, dataset and lookup tables, each loaded at most
//! once per store and shared by reference afterwards.
//!
//! RULE: Operations receive a `&ResourceStore`; nothing reads resource
//! files anywhere else. Tests build a store from in-memory parts with the
//! `with_*` methods and never touch the filesystem.

use crate::{
    config::DashboardConfig,
    dataset::ReferenceDataset,
    error::{DashError, DashResult},
    explain::{BaselineExplainer, Explainer},
    features::MedianTable,
    forecast::{Forecaster, SeasonalTrendForecaster},
    model::{Scorer, TreeEnsemble},
    types::FeatureName,
};
use serde::Deserialize;
use std::{cell::OnceCell, collections::HashMap, path::Path};

/// Feature name → human-readable label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMap {
    labels: HashMap<String, String>,
}

impl FeatureMap {
    pub fn new(labels: HashMap<String, String>) -> Self {
        Self { labels }
    }

    /// The display label, or the name itself when none is mapped.
    pub fn display_name(&self, name: &str) -> String {
        self.labels
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

/// Feature name → model importance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportanceTable {
    values: HashMap<String, f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportanceFile {
    Map(HashMap<String, f64>),
    List(Vec<ImportanceEntry>),
}

#[derive(Deserialize)]
struct ImportanceEntry {
    feature:    String,
    importance: f64,
}

impl ImportanceTable {
    pub fn new(values: HashMap<String, f64>) -> Self {
        Self { values }
    }

    /// Importances in `names` order; unknown features score 0.
    pub fn aligned(&self, names: &[FeatureName]) -> Vec<f64> {
        names
            .iter()
            .map(|n| self.values.get(n).copied().unwrap_or(0.0))
            .collect()
    }
}

pub struct ResourceStore {
    config:      DashboardConfig,
    scorer:      OnceCell<Box<dyn Scorer>>,
    dataset:     OnceCell<ReferenceDataset>,
    feature_map: OnceCell<FeatureMap>,
    medians:     OnceCell<MedianTable>,
    importance:  OnceCell<ImportanceTable>,
    explainer:   OnceCell<Box<dyn Explainer>>,
    forecaster:  Box<dyn Forecaster>,
}

impl ResourceStore {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            scorer:      OnceCell::new(),
            dataset:     OnceCell::new(),
            feature_map: OnceCell::new(),
            medians:     OnceCell::new(),
            importance:  OnceCell::new(),
            explainer:   OnceCell::new(),
            forecaster:  Box::new(SeasonalTrendForecaster::new()),
        }
    }

    // ── Injection ──────────────────────────────────────────────

    pub fn with_scorer(self, scorer: impl Scorer + 'static) -> Self {
        let _ = self.scorer.set(Box::new(scorer));
        self
    }

    pub fn with_dataset(self, dataset: ReferenceDataset) -> Self {
        let _ = self.dataset.set(dataset);
        self
    }

    pub fn with_feature_map(self, map: FeatureMap) -> Self {
        let _ = self.feature_map.set(map);
        self
    }

    pub fn with_medians(self, medians: MedianTable) -> Self {
        let _ = self.medians.set(medians);
        self
    }

    pub fn with_importance(self, importance: ImportanceTable) -> Self {
        let _ = self.importance.set(importance);
        self
    }

    pub fn with_explainer(self, explainer: impl Explainer + 'static) -> Self {
        let _ = self.explainer.set(Box::new(explainer));
        self
    }

    pub fn with_forecaster(mut self, forecaster: impl Forecaster + 'static) -> Self {
        self.forecaster = Box::new(forecaster);
        self
    }

    // ── Access ─────────────────────────────────────────────────

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Model, dataset and display names together.
    pub fn load(&self) -> DashResult<(&dyn Scorer, &ReferenceDataset, &FeatureMap)> {
        Ok((self.scorer()?, self.dataset()?, self.feature_map()?))
    }

    pub fn scorer(&self) -> DashResult<&dyn Scorer> {
        memoize(&self.scorer, || {
            let model = TreeEnsemble::load(&self.config.model_path())?;
            Ok(Box::new(model) as Box<dyn Scorer>)
        })
        .map(|s| &**s)
    }

    pub fn dataset(&self) -> DashResult<&ReferenceDataset> {
        memoize(&self.dataset, || {
            let path = self.config.dataset_path();
            let dataset = ReferenceDataset::load_csv(&path, &self.config.target_column)?;
            log::info!(
                "loaded dataset {}: {} rows x {} columns",
                path.display(),
                dataset.len(),
                dataset.columns().len()
            );
            Ok(dataset)
        })
    }

    pub fn feature_map(&self) -> DashResult<&FeatureMap> {
        memoize(&self.feature_map, || {
            let labels: HashMap<String, String> = read_json(&self.config.feature_map_path())?;
            Ok(FeatureMap::new(labels))
        })
    }

    pub fn medians(&self) -> DashResult<&MedianTable> {
        memoize(&self.medians, || {
            let values: HashMap<String, f64> = read_json(&self.config.medians_path())?;
            Ok(MedianTable::new(values))
        })
    }

    pub fn importance(&self) -> DashResult<&ImportanceTable> {
        memoize(&self.importance, || {
            let values = match read_json::<ImportanceFile>(&self.config.importance_path())? {
                ImportanceFile::Map(m) => m,
                ImportanceFile::List(entries) => entries
                    .into_iter()
                    .map(|e| (e.feature, e.importance))
                    .collect(),
            };
            Ok(ImportanceTable::new(values))
        })
    }

    /// Built on first use from a seeded sample of the dataset.
    pub fn explainer(&self) -> DashResult<&dyn Explainer> {
        memoize(&self.explainer, || {
            let scorer = self.scorer()?;
            let background = self.dataset()?.sample_matrix(
                scorer.feature_names(),
                self.config.explainer_background_rows,
                self.config.explainer_seed,
            )?;
            log::debug!("explainer background: {} rows", background.len());
            Ok(Box::new(BaselineExplainer::new(background)) as Box<dyn Explainer>)
        })
        .map(|e| &**e)
    }

    pub fn forecaster(&self) -> &dyn Forecaster {
        self.forecaster.as_ref()
    }
}

fn memoize<T>(cell: &OnceCell<T>, load: impl FnOnce() -> DashResult<T>) -> DashResult<&T> {
    if let Some(v) = cell.get() {
        return Ok(v);
    }
    let v = load()?;
    Ok(cell.get_or_init(|| v))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> DashResult<T> {
    let shown = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| DashError::resource(&shown, e))?;
    serde_json::from_str(&content).map_err(|e| DashError::resource(&shown, e))
}

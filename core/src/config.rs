use crate::{
    error::{DashError, DashResult},
    types::DEFAULT_TARGET_COLUMN,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Optional override file inside the data directory.
pub const CONFIG_FILE_NAME: &str = "dashboard.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Directory every relative file name below resolves against.
    #[serde(skip)]
    pub data_dir: PathBuf,
    pub model_file:       String,
    pub dataset_file:     String,
    pub feature_map_file: String,
    pub medians_file:     String,
    pub importance_file:  String,
    pub target_column:    String,
    /// Year used to turn (month, day) columns into calendar dates.
    pub assumed_year: i32,
    pub explainer_background_rows: usize,
    pub explainer_seed:            u64,
    pub default_forecast_days:     u32,
    /// SQLite path for prediction history; history is off when unset.
    pub history_db: Option<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir:                  PathBuf::from("."),
            model_file:                "model.json".into(),
            dataset_file:              "telecom_clean.csv".into(),
            feature_map_file:          "feature_mapping.json".into(),
            medians_file:              "feature_medians.json".into(),
            importance_file:           "feature_importance.json".into(),
            target_column:             DEFAULT_TARGET_COLUMN.into(),
            assumed_year:              2024,
            explainer_background_rows: 100,
            explainer_seed:            42,
            default_forecast_days:     30,
            history_db:                None,
        }
    }
}

impl DashboardConfig {
    /// Load from the data directory. `dashboard.json` is optional; when it
    /// is absent every setting takes its default.
    pub fn load(data_dir: impl AsRef<Path>) -> DashResult<Self> {
        let data_dir = data_dir.as_ref();
        let path = data_dir.join(CONFIG_FILE_NAME);

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| DashError::resource(path.display().to_string(), e))?;
            serde_json::from_str::<Self>(&content)
                .map_err(|e| DashError::resource(path.display().to_string(), e))?
        } else {
            log::debug!("no {CONFIG_FILE_NAME} in {}, using defaults", data_dir.display());
            Self::default()
        };
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    /// Defaults rooted at `data_dir`, without reading anything.
    pub fn for_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn resolve(&self, file: &str) -> PathBuf {
        let p = Path::new(file);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.data_dir.join(p)
        }
    }

    pub fn model_path(&self) -> PathBuf       { self.resolve(&self.model_file) }
    pub fn dataset_path(&self) -> PathBuf     { self.resolve(&self.dataset_file) }
    pub fn feature_map_path(&self) -> PathBuf { self.resolve(&self.feature_map_file) }
    pub fn medians_path(&self) -> PathBuf     { self.resolve(&self.medians_file) }
    pub fn importance_path(&self) -> PathBuf  { self.resolve(&self.importance_file) }
}

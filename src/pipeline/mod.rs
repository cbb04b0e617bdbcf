// src/pipeline/mod.rs
//! raw CSV → cleaned table → two forecasts → combined table.

pub mod cache;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};
use tracing::info;

use crate::{
    assemble::{assemble, ForecastTable},
    catalog::CatalogEntry,
    error::{ConfigError, PipelineError, Result},
    forecast::{ForecastConfig, ForecastEngine, ForecastResult},
    normalize::{normalize, read_rows_from, CleanedTable, DependencyPoint, DuplicatePolicy},
};
pub use cache::{SourceKey, TableCache};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of future years to project
    pub horizon: usize,
    pub duplicate_policy: DuplicatePolicy,
    pub forecast: ForecastConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            horizon: 3,
            duplicate_policy: DuplicatePolicy::default(),
            forecast: ForecastConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.horizon == 0 {
            return Err(ConfigError::Invalid {
                name: "horizon",
                reason: "must be at least one year".into(),
            });
        }
        self.forecast.validate()
    }
}

/// Everything the presentation layer needs for one commodity.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub commodity: Option<String>,
    pub source: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub cleaned: Arc<CleanedTable>,
    pub import_forecast: ForecastResult,
    pub export_forecast: ForecastResult,
    pub table: ForecastTable,
    pub dependency: Vec<DependencyPoint>,
}

/// Owns the configuration and the table cache; `&self` methods only, so one
/// pipeline can serve many requests (and threads).
pub struct Pipeline {
    config: PipelineConfig,
    engine: ForecastEngine,
    cache: TableCache,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let engine = ForecastEngine::new(config.forecast.clone())?;
        Ok(Self {
            config,
            engine,
            cache: TableCache::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &TableCache {
        &self.cache
    }

    /// Read and normalize `path`, reusing the cached table when the file
    /// content has been seen before.
    #[tracing::instrument(level = "info", skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Arc<CleanedTable>> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| PipelineError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        let key = SourceKey::from_bytes(&bytes);

        self.cache
            .get_or_try_insert(&key, || {
                let rows = read_rows_from(bytes.as_slice())?;
                normalize(&rows, self.config.duplicate_policy)
            })
            .map_err(|source| PipelineError::Format {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Forecast both series of an already-cleaned table and merge them.
    pub fn forecast_table(
        &self,
        cleaned: &CleanedTable,
    ) -> Result<(ForecastResult, ForecastResult, ForecastTable)> {
        let horizon = self.config.horizon;
        let import_forecast = self.engine.forecast(&cleaned.imports(), horizon)?;
        let export_forecast = self.engine.forecast(&cleaned.exports(), horizon)?;
        let table = assemble(cleaned, &import_forecast, &export_forecast)?;
        Ok((import_forecast, export_forecast, table))
    }

    pub fn run<P: AsRef<Path>>(&self, path: P) -> Result<Report> {
        self.run_named(None, path.as_ref())
    }

    pub fn run_entry(&self, entry: &CatalogEntry) -> Result<Report> {
        self.run_named(Some(entry.name.clone()), &entry.path)
    }

    /// Run every entry in parallel; results come back in input order.
    pub fn run_many(&self, entries: &[CatalogEntry]) -> Vec<(String, Result<Report>)> {
        entries
            .par_iter()
            .map(|entry| (entry.name.clone(), self.run_entry(entry)))
            .collect()
    }

    fn run_named(&self, commodity: Option<String>, path: &Path) -> Result<Report> {
        let start = Instant::now();
        let cleaned = self.load(path)?;
        let (import_forecast, export_forecast, table) = self.forecast_table(&cleaned)?;
        info!(
            commodity = commodity.as_deref().unwrap_or("-"),
            years = cleaned.len(),
            import_method = ?import_forecast.method,
            export_method = ?export_forecast.method,
            elapsed = ?start.elapsed(),
            "pipeline finished"
        );
        Ok(Report {
            commodity,
            source: path.to_path_buf(),
            generated_at: Utc::now(),
            dependency: cleaned.dependency_series(),
            cleaned,
            import_forecast,
            export_forecast,
            table,
        })
    }
}

//! Yearly import/export trade tables → cleaned series, dependency ratios and
//! a short forecast with a labeled fallback.

pub mod assemble;
pub mod catalog;
pub mod error;
pub mod export;
pub mod forecast;
pub mod normalize;
pub mod pipeline;

pub use assemble::{assemble, ForecastRow, ForecastTable};
pub use catalog::{Catalog, CatalogEntry};
pub use error::{
    AssembleError, CatalogError, ConfigError, ForecastError, FormatError, ModelFitFailure,
    PipelineError,
};
pub use forecast::{ForecastConfig, ForecastEngine, ForecastResult, Method};
pub use normalize::{normalize, CleanedRecord, CleanedTable, DependencyPoint, DuplicatePolicy, RawRow};
pub use pipeline::{Pipeline, PipelineConfig, Report, TableCache};

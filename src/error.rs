// src/error.rs

use std::{io, path::PathBuf};
use thiserror::Error;

/// Result type for whole-pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// A year or value cell that could not be turned into a number.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    /// Required column missing from the input header
    #[error("missing required column `{0}`")]
    MissingColumn(String),

    /// Year label whose first `-` token is not an integer
    #[error("row {row}: year label `{label}` is not an integer year")]
    Year { row: usize, label: String },

    /// Numeric cell that is not a finite number once separators are stripped
    #[error("row {row}: column `{column}` value `{value}` is not numeric")]
    Number {
        row: usize,
        column: &'static str,
        value: String,
    },

    /// Two rows reduce to the same year under the reject policy
    #[error("year {year} appears more than once (rows {first} and {second})")]
    DuplicateYear {
        year: i32,
        first: usize,
        second: usize,
    },

    /// The CSV itself is malformed (unbalanced quotes, bad UTF-8, ...)
    #[error("malformed CSV record: {0}")]
    Csv(String),
}

/// Why the primary model was not used. Always recovered by the fallback.
#[derive(Error, Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelFitFailure {
    #[error("series has {actual} points, model needs at least {required}")]
    TooShort { required: usize, actual: usize },

    #[error("optimizer did not converge within {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("fit exceeded time budget of {budget_ms} ms")]
    Timeout { budget_ms: u64 },

    #[error("fitted model is unusable: {reason}")]
    Unstable { reason: String },

    #[error("primary model disabled by configuration")]
    Disabled,
}

/// Caller bugs that must not be papered over by the fallback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("cannot forecast an empty series")]
    EmptySeries,

    #[error("series value at index {index} is not finite ({value})")]
    InvalidSeries { index: usize, value: f64 },

    #[error("growth projection from {last} leaves the f64 range at step {step}")]
    Overflow { step: usize, last: f64 },
}

/// Contract violations when merging history and projections.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssembleError {
    #[error("import horizon {import} differs from export horizon {export}")]
    HorizonMismatch { import: usize, export: usize },

    #[error("{series} forecast declares horizon {horizon} but carries {len} values")]
    LengthMismatch {
        series: &'static str,
        horizon: usize,
        len: usize,
    },

    #[error("cannot place {horizon} future years after an empty history")]
    NoHistory { horizon: usize },

    #[error("future year {step} after {last_year} is out of range")]
    YearOverflow { last_year: i32, step: usize },
}

/// Configuration that fails validation before any work starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid setting `{name}`: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Everything a pipeline run can surface to its caller, one variant per kind.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input table cannot be read
    #[error("source {} is unavailable: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("source {} is malformed: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Loading or querying the commodity catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("cannot read catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse catalog {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no commodity named `{0}` in catalog")]
    UnknownCommodity(String),

    #[error("commodity `{0}` is listed more than once")]
    DuplicateName(String),
}

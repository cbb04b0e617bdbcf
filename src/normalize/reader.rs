// src/normalize/reader.rs

use csv::{ReaderBuilder, StringRecord, Trim};
use std::{fs, io::Read, path::Path};
use tracing::{debug, warn};

use super::RawRow;
use crate::error::{FormatError, PipelineError};

pub const YEAR_COLUMN: &str = "Year";
pub const IMPORT_COLUMN: &str = "Import_value(in cr.)";
pub const EXPORT_COLUMN: &str = "Export_value(in cr.)";

const REQUIRED_COLUMNS: [&str; 3] = [YEAR_COLUMN, IMPORT_COLUMN, EXPORT_COLUMN];

/// Read a trade table from disk. Open/read failures are `SourceUnavailable`,
/// anything wrong with the content is `Format`.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<Vec<RawRow>, PipelineError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| PipelineError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    read_rows_from(bytes.as_slice()).map_err(|source| PipelineError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse CSV text with a header row carrying the three required columns.
/// Extra columns are ignored; blank lines are skipped.
pub fn read_rows_from<R: Read>(reader: R) -> Result<Vec<RawRow>, FormatError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| FormatError::Csv(e.to_string()))?
        .clone();
    check_headers(&headers)?;

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| FormatError::Csv(e.to_string()))?;
        if record.iter().all(str::is_empty) {
            debug!(row = idx + 1, "skipping blank row");
            continue;
        }
        let row: RawRow = record
            .deserialize(Some(&headers))
            .map_err(|e| FormatError::Csv(format!("row {}: {}", idx + 1, e)))?;
        rows.push(row);
    }

    if rows.is_empty() {
        warn!("trade table has a header but no data rows");
    }
    Ok(rows)
}

fn check_headers(headers: &StringRecord) -> Result<(), FormatError> {
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(FormatError::MissingColumn(required.to_string()));
        }
    }
    Ok(())
}

// src/normalize/mod.rs
//! Raw trade rows → sorted numeric table with dependency ratios.

pub mod parse;
pub mod reader;

use serde::{Deserialize, Serialize};
use std::collections::{btree_map::Entry, BTreeMap};
use tracing::{debug, info, warn};

use crate::error::FormatError;
use parse::{parse_amount, parse_year, ratio};

pub use reader::{read_rows, read_rows_from, EXPORT_COLUMN, IMPORT_COLUMN, YEAR_COLUMN};

/// One input line, still as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Year")]
    pub year_label: String,
    #[serde(rename = "Import_value(in cr.)")]
    pub import_raw: String,
    #[serde(rename = "Export_value(in cr.)")]
    pub export_raw: String,
}

impl RawRow {
    pub fn new(year: impl Into<String>, import: impl Into<String>, export: impl Into<String>) -> Self {
        Self {
            year_label: year.into(),
            import_raw: import.into(),
            export_raw: export.into(),
        }
    }
}

/// A cleaned year of trade. `None` ratios mean the denominator was zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub year: i32,
    pub import_value: f64,
    pub export_value: f64,
    pub dependency: Option<f64>,
    pub export_dependency: Option<f64>,
}

impl CleanedRecord {
    pub fn new(year: i32, import_value: f64, export_value: f64) -> Self {
        let dependency = ratio(import_value, export_value);
        let export_dependency = ratio(export_value, import_value);
        if dependency.is_none() || export_dependency.is_none() {
            debug!(year, import_value, export_value, "undefined dependency ratio");
        }
        Self {
            year,
            import_value,
            export_value,
            dependency,
            export_dependency,
        }
    }
}

/// Ratio chart point for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyPoint {
    pub year: i32,
    pub dependency: Option<f64>,
    pub export_dependency: Option<f64>,
}

/// How rows that reduce to the same year are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with `FormatError::DuplicateYear`
    #[default]
    Reject,
    /// Last row in input order wins
    KeepLast,
    /// Import and export values are summed, ratios recomputed
    Sum,
}

/// Records sorted ascending by year, unique by year.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CleanedTable {
    records: Vec<CleanedRecord>,
}

impl CleanedTable {
    pub fn records(&self) -> &[CleanedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last_year(&self) -> Option<i32> {
        self.records.last().map(|r| r.year)
    }

    pub fn years(&self) -> Vec<i32> {
        self.records.iter().map(|r| r.year).collect()
    }

    pub fn imports(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.import_value).collect()
    }

    pub fn exports(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.export_value).collect()
    }

    pub fn dependency_series(&self) -> Vec<DependencyPoint> {
        self.records
            .iter()
            .map(|r| DependencyPoint {
                year: r.year,
                dependency: r.dependency,
                export_dependency: r.export_dependency,
            })
            .collect()
    }
}

/// Parse every row, then order and de-duplicate by year under `policy`.
///
/// Row numbers in errors are 1-based data rows (the header is not counted).
#[tracing::instrument(level = "debug", skip(rows), fields(rows = rows.len()))]
pub fn normalize(rows: &[RawRow], policy: DuplicatePolicy) -> Result<CleanedTable, FormatError> {
    let mut parsed: Vec<(usize, CleanedRecord)> = Vec::with_capacity(rows.len());

    for (idx, raw) in rows.iter().enumerate() {
        let row = idx + 1;
        let year = parse_year(&raw.year_label).ok_or_else(|| FormatError::Year {
            row,
            label: raw.year_label.clone(),
        })?;
        let import_value = parse_amount(&raw.import_raw).ok_or_else(|| FormatError::Number {
            row,
            column: IMPORT_COLUMN,
            value: raw.import_raw.clone(),
        })?;
        let export_value = parse_amount(&raw.export_raw).ok_or_else(|| FormatError::Number {
            row,
            column: EXPORT_COLUMN,
            value: raw.export_raw.clone(),
        })?;
        parsed.push((row, CleanedRecord::new(year, import_value, export_value)));
    }

    // BTreeMap keeps years ordered; insertion order within a year is input order,
    // which is the same result a stable sort would give.
    let mut by_year: BTreeMap<i32, (usize, CleanedRecord)> = BTreeMap::new();
    for (row, rec) in parsed {
        match by_year.entry(rec.year) {
            Entry::Vacant(slot) => {
                slot.insert((row, rec));
            }
            Entry::Occupied(mut slot) => {
                let (first, existing) = slot.get_mut();
                match policy {
                    DuplicatePolicy::Reject => {
                        return Err(FormatError::DuplicateYear {
                            year: rec.year,
                            first: *first,
                            second: row,
                        });
                    }
                    DuplicatePolicy::KeepLast => {
                        warn!(year = rec.year, row, "duplicate year, keeping last row");
                        *first = row;
                        *existing = rec;
                    }
                    DuplicatePolicy::Sum => {
                        warn!(year = rec.year, row, "duplicate year, summing values");
                        *existing = CleanedRecord::new(
                            rec.year,
                            existing.import_value + rec.import_value,
                            existing.export_value + rec.export_value,
                        );
                    }
                }
            }
        }
    }

    let records: Vec<CleanedRecord> = by_year.into_values().map(|(_, rec)| rec).collect();
    info!(years = records.len(), "normalized table");
    Ok(CleanedTable { records })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[(&str, &str, &str)]) -> Vec<RawRow> {
        data.iter().map(|(y, i, e)| RawRow::new(*y, *i, *e)).collect()
    }

    #[test]
    fn test_normalize_sorts_and_computes_ratios() {
        let input = rows(&[
            ("2021-2022", "120", "90"),
            ("2020-2021", "1,00", "80"),
            ("2022", "140", "110"),
        ]);
        let table = normalize(&input, DuplicatePolicy::Reject).unwrap();

        assert_eq!(table.years(), vec![2020, 2021, 2022]);
        assert_eq!(table.imports(), vec![100.0, 120.0, 140.0]);
        assert_eq!(table.exports(), vec![80.0, 90.0, 110.0]);

        let deps: Vec<f64> = table
            .records()
            .iter()
            .map(|r| r.dependency.unwrap())
            .collect();
        assert!((deps[0] - 1.25).abs() < 1e-9);
        assert!((deps[1] - 1.3333).abs() < 1e-3);
        assert!((deps[2] - 1.2727).abs() < 1e-3);

        for r in table.records() {
            let product = r.dependency.unwrap() * r.export_dependency.unwrap();
            assert!((product - 1.0).abs() < 1e-12, "product {} for {}", product, r.year);
        }
    }

    #[test]
    fn test_normalize_zero_denominator_is_marked() {
        let input = rows(&[("2019", "0", "50"), ("2020", "10", "0"), ("2021", "0", "0")]);
        let table = normalize(&input, DuplicatePolicy::Reject).unwrap();
        let r = table.records();

        assert_eq!(r[0].dependency, Some(0.0));
        assert_eq!(r[0].export_dependency, None);
        assert_eq!(r[1].dependency, None);
        assert_eq!(r[1].export_dependency, Some(0.0));
        assert_eq!(r[2].dependency, None);
        assert_eq!(r[2].export_dependency, None);
    }

    #[test]
    fn test_normalize_reports_bad_year() {
        let input = rows(&[("2019", "1", "2"), ("abc", "1", "2")]);
        let err = normalize(&input, DuplicatePolicy::Reject).unwrap_err();
        assert_eq!(
            err,
            FormatError::Year {
                row: 2,
                label: "abc".into()
            }
        );
    }

    #[test]
    fn test_normalize_reports_bad_number() {
        let input = rows(&[("2019", "1", "--")]);
        let err = normalize(&input, DuplicatePolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            FormatError::Number {
                row: 1,
                column: EXPORT_COLUMN,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_policies() {
        let input = rows(&[
            ("2017-2018", "10", "5"),
            ("2018", "1", "1"),
            ("2017-2019", "30", "15"),
        ]);

        let err = normalize(&input, DuplicatePolicy::Reject).unwrap_err();
        assert_eq!(
            err,
            FormatError::DuplicateYear {
                year: 2017,
                first: 1,
                second: 3
            }
        );

        let last = normalize(&input, DuplicatePolicy::KeepLast).unwrap();
        assert_eq!(last.years(), vec![2017, 2018]);
        assert_eq!(last.records()[0].import_value, 30.0);

        let sum = normalize(&input, DuplicatePolicy::Sum).unwrap();
        assert_eq!(sum.years(), vec![2017, 2018]);
        assert_eq!(sum.records()[0].import_value, 40.0);
        assert_eq!(sum.records()[0].export_value, 20.0);
        assert_eq!(sum.records()[0].dependency, Some(2.0));
    }

    #[test]
    fn test_years_strictly_increasing() {
        let input = rows(&[
            ("2015", "1", "1"),
            ("2011", "1", "1"),
            ("2013-14", "1", "1"),
            ("2012", "1", "1"),
        ]);
        let table = normalize(&input, DuplicatePolicy::Reject).unwrap();
        let years = table.years();
        assert!(years.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_empty_input_is_empty_table() {
        let table = normalize(&[], DuplicatePolicy::Reject).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.last_year(), None);
    }
}

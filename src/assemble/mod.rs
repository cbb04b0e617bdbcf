// src/assemble/mod.rs

use serde::Serialize;
use tracing::debug;

use crate::error::AssembleError;
use crate::forecast::ForecastResult;
use crate::normalize::CleanedTable;

/// One year of the combined table. Historical rows carry actuals only,
/// future rows carry forecasts only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub year: i32,
    pub import_actual: Option<f64>,
    pub export_actual: Option<f64>,
    pub import_forecast: Option<f64>,
    pub export_forecast: Option<f64>,
}

impl ForecastRow {
    pub fn is_forecast(&self) -> bool {
        self.import_forecast.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ForecastTable {
    rows: Vec<ForecastRow>,
}

impl ForecastTable {
    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn history(&self) -> impl Iterator<Item = &ForecastRow> {
        self.rows.iter().filter(|r| !r.is_forecast())
    }

    pub fn future(&self) -> impl Iterator<Item = &ForecastRow> {
        self.rows.iter().filter(|r| r.is_forecast())
    }
}

/// Append the two projections to the history, one row per future year.
pub fn assemble(
    cleaned: &CleanedTable,
    import_forecast: &ForecastResult,
    export_forecast: &ForecastResult,
) -> Result<ForecastTable, AssembleError> {
    if import_forecast.horizon != export_forecast.horizon {
        return Err(AssembleError::HorizonMismatch {
            import: import_forecast.horizon,
            export: export_forecast.horizon,
        });
    }
    let horizon = import_forecast.horizon;
    for (series, fc) in [("import", import_forecast), ("export", export_forecast)] {
        if fc.values.len() != fc.horizon {
            return Err(AssembleError::LengthMismatch {
                series,
                horizon: fc.horizon,
                len: fc.values.len(),
            });
        }
    }

    let mut rows: Vec<ForecastRow> = Vec::with_capacity(cleaned.len() + horizon);
    rows.extend(cleaned.records().iter().map(|r| ForecastRow {
        year: r.year,
        import_actual: Some(r.import_value),
        export_actual: Some(r.export_value),
        import_forecast: None,
        export_forecast: None,
    }));

    if horizon > 0 {
        let last_year = cleaned
            .last_year()
            .ok_or(AssembleError::NoHistory { horizon })?;
        for (i, (&imp, &exp)) in import_forecast
            .values
            .iter()
            .zip(&export_forecast.values)
            .enumerate()
        {
            let step = i + 1;
            let year = i32::try_from(step)
                .ok()
                .and_then(|s| last_year.checked_add(s))
                .ok_or(AssembleError::YearOverflow { last_year, step })?;
            rows.push(ForecastRow {
                year,
                import_actual: None,
                export_actual: None,
                import_forecast: Some(imp),
                export_forecast: Some(exp),
            });
        }
    }

    debug!(history = cleaned.len(), horizon, "assembled forecast table");
    Ok(ForecastTable { rows })
}

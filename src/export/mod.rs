// src/export/mod.rs

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Float64Array, Int32Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
    sync::Arc,
};
use tracing::info;

use crate::assemble::{ForecastRow, ForecastTable};
use crate::pipeline::Report;

pub fn forecast_table_schema() -> Schema {
    Schema::new(vec![
        Field::new("year", DataType::Int32, false),
        Field::new("import_actual", DataType::Float64, true),
        Field::new("export_actual", DataType::Float64, true),
        Field::new("import_forecast", DataType::Float64, true),
        Field::new("export_forecast", DataType::Float64, true),
    ])
}

/// Absent values become Arrow nulls.
pub fn forecast_table_batch(table: &ForecastTable) -> Result<RecordBatch> {
    let rows = table.rows();
    let column = |get: fn(&ForecastRow) -> Option<f64>| -> ArrayRef {
        Arc::new(rows.iter().map(get).collect::<Float64Array>())
    };

    let cols: Vec<ArrayRef> = vec![
        Arc::new(Int32Array::from(
            rows.iter().map(|r| r.year).collect::<Vec<i32>>(),
        )),
        column(|r| r.import_actual),
        column(|r| r.export_actual),
        column(|r| r.import_forecast),
        column(|r| r.export_forecast),
    ];

    RecordBatch::try_new(Arc::new(forecast_table_schema()), cols)
        .context("building forecast table batch")
}

/// Write the combined table as a single Snappy-compressed parquet file,
/// going through a temp file so readers never see a partial write.
pub fn write_parquet(table: &ForecastTable, output_path: &Path) -> Result<u64> {
    let batch = forecast_table_batch(table)?;
    let tmp = output_path.with_extension("parquet.tmp");

    let file = File::create(&tmp).with_context(|| format!("creating file {}", tmp.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))
        .context("creating parquet writer")?;
    writer.write(&batch).context("writing batch to parquet")?;
    writer.close().context("closing parquet writer")?;

    fs::rename(&tmp, output_path)
        .with_context(|| format!("renaming {} -> {}", tmp.display(), output_path.display()))?;
    let size = fs::metadata(output_path)
        .context("getting file metadata")?
        .len();
    info!(path = %output_path.display(), rows = batch.num_rows(), size, "wrote parquet");
    Ok(size)
}

/// Pretty JSON of the whole report, trailing newline included.
pub fn write_json(report: &Report, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("creating file {}", output_path.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, report).context("serializing report")?;
    out.write_all(b"\n")?;
    out.flush()?;
    info!(path = %output_path.display(), "wrote report");
    Ok(())
}

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::Table;
use crate::error::PeakError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a measurement table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – normalized comma-separated text, header row first
/// * `.parquet`      – flat numeric columns
///
/// In both cases the first column is the index (time or potential) and
/// every other column is a value column.
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" => load_csv(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row, then one numeric row per sample.
/// Cells are trimmed; an empty cell reads as NaN.
fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_path(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let Some((index_name, value_names)) = headers.split_first() else {
        return Err(PeakError::MissingIndex).context(format!("{}", path.display()));
    };
    if index_name.is_empty() {
        return Err(PeakError::MissingIndex).context(format!("{}", path.display()));
    }

    let mut index = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); value_names.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (col_idx, cell) in record.iter().enumerate() {
            let v = parse_cell(cell)
                .with_context(|| format!("Row {row_no}, {}: '{cell}' is not a number", headers[col_idx]))?;
            if col_idx == 0 {
                index.push(v);
            } else {
                values[col_idx - 1].push(v);
            }
        }
    }

    let columns = value_names.iter().cloned().zip(values).collect();
    Ok(Table::new(index_name.clone(), index, columns)?)
}

fn parse_cell(s: &str) -> Result<f64> {
    if s.is_empty() {
        return Ok(f64::NAN);
    }
    Ok(s.parse::<f64>()?)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one numeric column per series.
///
/// Expected schema: first column is the index, the rest are value columns.
/// Float64, Float32, Int64 and Int32 columns are accepted; nulls read as NaN.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut names: Vec<String> = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        if names.is_empty() {
            names = schema.fields().iter().map(|f| f.name().clone()).collect();
            columns = vec![Vec::new(); names.len()];
        }

        for (col_idx, target) in columns.iter_mut().enumerate() {
            let values = extract_f64_column(batch.column(col_idx))
                .with_context(|| format!("column '{}'", names[col_idx]))?;
            target.extend(values);
        }
    }

    if names.is_empty() {
        return Err(PeakError::MissingIndex).context(format!("{}", path.display()));
    }

    let index_name = names.remove(0);
    let index = columns.remove(0);
    Ok(Table::new(index_name, index, names.into_iter().zip(columns).collect())?)
}

// -- Arrow helpers --

/// Read a flat numeric Arrow column as `f64`.
fn extract_f64_column(col: &Arc<dyn Array>) -> Result<Vec<f64>> {
    let any = col.as_any();
    let values = match col.data_type() {
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .context("expected Float64Array")?
            .iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect(),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .context("expected Float32Array")?
            .iter()
            .map(|v| v.map(f64::from).unwrap_or(f64::NAN))
            .collect(),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .context("expected Int64Array")?
            .iter()
            .map(|v| v.map(|i| i as f64).unwrap_or(f64::NAN))
            .collect(),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .context("expected Int32Array")?
            .iter()
            .map(|v| v.map(f64::from).unwrap_or(f64::NAN))
            .collect(),
        other => bail!("Expected a numeric column, got {other:?}"),
    };
    Ok(values)
}

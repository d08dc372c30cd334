use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::data::model::Table;
use crate::error::{PeakError, Result};
use crate::signal::Filtered;

pub const PROMINENCE_COLUMN: &str = "prominence";
pub const HEIGHT_COLUMN: &str = "height";

// ---------------------------------------------------------------------------
// PeakRecord – one summary row
// ---------------------------------------------------------------------------

/// One detected peak: the series row it sits on plus how it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakRecord {
    /// Index value (time / potential) of the peak.
    pub index: f64,
    /// Every selected column at that row, in column order.
    pub values: Vec<f64>,
    pub prominence: f64,
    /// The run's min-height gate, copied onto every record of the batch.
    pub height: f64,
}

/// Report header for rows built from `series`.
pub fn header_for(series: &Table) -> Vec<String> {
    std::iter::once(series.index_name.clone())
        .chain(series.columns.iter().cloned())
        .chain([PROMINENCE_COLUMN.to_string(), HEIGHT_COLUMN.to_string()])
        .collect()
}

/// One record per surviving peak, in peak order.
pub fn build_records(series: &Table, filtered: &Filtered, min_height: f64) -> Vec<PeakRecord> {
    filtered
        .peaks
        .iter()
        .zip(&filtered.prominences)
        .map(|(&row, &prominence)| PeakRecord {
            index: series.index[row],
            values: series.row(row),
            prominence,
            height: min_height,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// ReportTarget – append-only summary CSV
// ---------------------------------------------------------------------------

/// An append-only CSV summary on disk.
///
/// There is no locking: exactly one writer may append to a given path at a
/// time. The batch driver guarantees this by processing files sequentially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTarget {
    pub path: PathBuf,
}

impl ReportTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append `records` under `header`.
    ///
    /// A missing or empty file is created with the header first; an existing
    /// one only receives new rows. Rows are serialized up front and written
    /// in one call, and nothing is written when the existing header differs.
    /// Returns the number of rows appended.
    pub fn append(&self, header: &[String], records: &[PeakRecord]) -> Result<usize> {
        let fresh = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };

        if !fresh {
            let found = read_header(&self.path)?;
            if found != header {
                return Err(PeakError::ReportSchemaMismatch {
                    path: self.path.clone(),
                    expected: header.to_vec(),
                    found,
                });
            }
        }

        let mut buf = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        if fresh {
            buf.write_record(header)?;
        }
        for rec in records {
            buf.write_record(record_fields(rec))?;
        }
        let bytes = buf.into_inner().map_err(|e| e.into_error())?;

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(&bytes)?;
        file.flush()?;

        log::info!(
            "appended {} peak rows to {}{}",
            records.len(),
            self.path.display(),
            if fresh { " (new report)" } else { "" }
        );
        Ok(records.len())
    }

    /// Read back the header and every record.
    ///
    /// A field that is not a number, or a row too short to hold an index,
    /// prominence and height, is an error naming its line.
    pub fn read(&self) -> Result<(Vec<String>, Vec<PeakRecord>)> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut records = Vec::new();
        for (n, row) in reader.records().enumerate() {
            let row = row?;
            // header is line 1
            let line = n + 2;
            let malformed = |reason: String| PeakError::MalformedReport {
                path: self.path.clone(),
                line,
                reason,
            };

            let fields = row
                .iter()
                .map(|f| {
                    f.parse::<f64>()
                        .map_err(|_| malformed(format!("'{f}' is not a number")))
                })
                .collect::<Result<Vec<_>>>()?;
            let rec = record_from_fields(&fields)
                .ok_or_else(|| malformed(format!("{} fields, need at least 3", fields.len())))?;
            records.push(rec);
        }
        Ok((header, records))
    }
}

fn read_header(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_reader(File::open(path)?);
    Ok(reader.headers()?.iter().map(str::to_string).collect())
}

// Plain `Display` prints the shortest string that parses back to the same f64.
fn record_fields(rec: &PeakRecord) -> Vec<String> {
    std::iter::once(rec.index)
        .chain(rec.values.iter().copied())
        .chain([rec.prominence, rec.height])
        .map(|v| v.to_string())
        .collect()
}

fn record_from_fields(fields: &[f64]) -> Option<PeakRecord> {
    let (&height, rest) = fields.split_last()?;
    let (&prominence, rest) = rest.split_last()?;
    let (&index, values) = rest.split_first()?;
    Some(PeakRecord {
        index,
        values: values.to_vec(),
        prominence,
        height,
    })
}

/// Build and append the records for one detection pass.
pub fn report(
    series: &Table,
    filtered: &Filtered,
    min_height: f64,
    target: &ReportTarget,
) -> Result<usize> {
    let records = build_records(series, filtered, min_height);
    target.append(&header_for(series), &records)
}

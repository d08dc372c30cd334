use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// PeakError – failures of the signal-extraction core
// ---------------------------------------------------------------------------

/// Errors raised by the preprocessing / detection / reporting core.
///
/// Empty ranges and "no peaks found" are not errors:
/// those paths return empty results.
#[derive(Debug, Error)]
pub enum PeakError {
    /// A requested value column does not exist in the table.
    #[error("column {selector} not found (available: {available:?})")]
    MissingColumn {
        selector: String,
        available: Vec<String>,
    },

    /// The table has no index column at all.
    #[error("table has no index column")]
    MissingIndex,

    /// Index and value columns disagree on the number of rows.
    #[error("column '{column}' has {found} rows but the index has {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },

    /// Smoothing span must be at least one sample.
    #[error("smoothing span must be >= 1, got {0}")]
    InvalidSmoothingSpan(usize),

    /// An existing report was written with a different column layout.
    #[error("report {path:?} has header {found:?}, refusing to append rows shaped {expected:?}")]
    ReportSchemaMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A report row that does not read back as a peak record.
    #[error("report {path:?} line {line}: {reason}")]
    MalformedReport {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PeakError>;

//! Peak and valley extraction for electrochemical measurement traces.
//!
//! Raw instrument exports are normalized to CSV ([`data::reformat`]), loaded
//! into a [`Table`], preprocessed and searched for extrema ([`signal`]), and
//! the surviving peaks are appended to a per-file summary ([`report`]).
//! [`pipeline`] strings these together for a folder of exports.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod plot;
pub mod report;
pub mod signal;

pub use config::{Detector, RunConfig};
pub use data::model::{ColumnSelector, Table};
pub use error::{PeakError, Result};
pub use pipeline::{Analysis, BatchSummary, Workspace, run_batch};
pub use report::{PeakRecord, ReportTarget};
pub use signal::{Direction, Filtered, Smoothing};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::model::ColumnSelector;
use crate::data::reformat::{DEFAULT_HEADER, ReformatOptions, Separator};
use crate::error::Result;
use crate::signal::summary::DEFAULT_SCAN_THRESHOLD;
use crate::signal::{Direction, Smoothing};

/// Default minimum prominence.
pub const DEFAULT_THRESHOLD: f64 = 1e-8;
/// Default min-height gate.
pub const DEFAULT_MIN_HEIGHT: f64 = 1e-7;

// ---------------------------------------------------------------------------
// Detector choice
// ---------------------------------------------------------------------------

/// Which candidate search feeds the prominence filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detector {
    /// Strict local maxima of the signed series above `min_height`.
    #[default]
    Prominence,
    /// Strict local minima below `threshold`, scanned from position 2.
    LocalMinimum { threshold: f64 },
}

impl Detector {
    pub fn local_minimum() -> Self {
        Detector::LocalMinimum {
            threshold: DEFAULT_SCAN_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// RunConfig – everything the form / JSON file collects for one batch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Folder holding the raw exports; `figures/`, `summary/` and
    /// `formatted/` are created inside it.
    pub source_dir: PathBuf,
    /// Keyword identifying the header line of each export.
    pub header: String,
    pub separator: Separator,
    /// Lines between header and data.
    pub blank_lines: usize,
    /// Columns to analyse one at a time; `None` analyses all together.
    pub columns: Option<Vec<ColumnSelector>>,
    pub smoothing: Smoothing,
    /// Inclusive index range; `None` keeps the full range.
    pub bounds: Option<(f64, f64)>,
    /// Render a PNG per analysed column into `figures/`.
    pub graph: bool,
    /// Minimum prominence a peak must exceed.
    pub threshold: f64,
    /// Minimum signed value for a candidate.
    pub min_height: f64,
    pub direction: Direction,
    pub detector: Detector,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            header: DEFAULT_HEADER.to_string(),
            separator: Separator::Comma,
            blank_lines: 1,
            columns: None,
            smoothing: Smoothing::Off,
            bounds: None,
            graph: false,
            threshold: DEFAULT_THRESHOLD,
            min_height: DEFAULT_MIN_HEIGHT,
            direction: Direction::Peak,
            detector: Detector::Prominence,
        }
    }
}

impl RunConfig {
    /// Read a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn reformat_options(&self) -> ReformatOptions {
        ReformatOptions {
            separator: self.separator,
            header: self.header.clone(),
            blank_lines: self.blank_lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_uses_defaults() {
        let cfg: RunConfig = serde_json::from_str(r#"{ "source_dir": "/data/cv" }"#).unwrap();
        assert_eq!(cfg.source_dir, PathBuf::from("/data/cv"));
        assert_eq!(cfg.header, "Potential/V");
        assert_eq!(cfg.threshold, 1e-8);
        assert_eq!(cfg.min_height, 1e-7);
        assert_eq!(cfg.direction, Direction::Peak);
        assert_eq!(cfg.smoothing, Smoothing::Off);
        assert_eq!(cfg.detector, Detector::Prominence);
    }

    #[test]
    fn full_json() {
        let cfg: RunConfig = serde_json::from_str(
            r#"{
                "source_dir": "runs",
                "separator": "tab",
                "blank_lines": 2,
                "columns": [2, "Current/A"],
                "smoothing": 15,
                "bounds": [-0.2, 0.6],
                "graph": true,
                "threshold": 0.0,
                "min_height": 1.5e-7,
                "direction": "valley",
                "detector": { "local_minimum": { "threshold": -4e-8 } }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.separator, Separator::Tab);
        assert_eq!(
            cfg.columns,
            Some(vec![ColumnSelector::Position(2), ColumnSelector::Name("Current/A".into())])
        );
        assert_eq!(cfg.smoothing, Smoothing::Span(15));
        assert_eq!(cfg.bounds, Some((-0.2, 0.6)));
        assert_eq!(cfg.direction, Direction::Valley);
        assert_eq!(cfg.detector, Detector::LocalMinimum { threshold: -4e-8 });
    }

    #[test]
    fn zero_smoothing_span_is_a_config_error() {
        let res = serde_json::from_str::<RunConfig>(r#"{ "smoothing": 0 }"#);
        assert!(res.is_err());
    }
}

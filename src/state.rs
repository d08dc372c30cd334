use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use ec_peaks::config::{DEFAULT_MIN_HEIGHT, DEFAULT_THRESHOLD, Detector, RunConfig};
use ec_peaks::data::model::ColumnSelector;
use ec_peaks::data::reformat::{DEFAULT_HEADER, Separator};
use ec_peaks::pipeline::{Analysis, BatchSummary, effective_direction, run_batch};
use ec_peaks::signal::summary::DEFAULT_SCAN_THRESHOLD;
use ec_peaks::{Direction, Smoothing};

// ---------------------------------------------------------------------------
// Form state – raw text as typed, parsed only when the run starts
// ---------------------------------------------------------------------------

/// Every input of the run form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub folder: String,
    pub header: String,
    pub separator: Separator,
    pub blank_lines: usize,
    /// `[0, 2]`, `0, 2` or `Current/A`; empty for all columns.
    pub columns: String,
    pub smooth: bool,
    pub smooth_span: usize,
    pub entire_bound: bool,
    pub lower_bound: String,
    pub upper_bound: String,
    pub graph: bool,
    pub threshold: String,
    pub min_height: String,
    /// Checked for peaks, unchecked for valleys.
    pub peak: bool,
    pub local_minimum: bool,
    pub scan_threshold: String,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            folder: String::new(),
            header: DEFAULT_HEADER.to_string(),
            separator: Separator::Comma,
            blank_lines: 1,
            columns: String::new(),
            smooth: false,
            smooth_span: Smoothing::DEFAULT_SPAN,
            entire_bound: true,
            lower_bound: String::new(),
            upper_bound: String::new(),
            graph: true,
            threshold: DEFAULT_THRESHOLD.to_string(),
            min_height: DEFAULT_MIN_HEIGHT.to_string(),
            peak: false,
            local_minimum: false,
            scan_threshold: DEFAULT_SCAN_THRESHOLD.to_string(),
        }
    }
}

fn parse_f64(field: &str, text: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .with_context(|| format!("{field}: '{text}' is not a number"))
}

/// Parse the column list; empty text means "all columns".
pub fn parse_columns(text: &str) -> Option<Vec<ColumnSelector>> {
    let inner = text.trim().trim_start_matches('[').trim_end_matches(']');
    let selectors: Vec<ColumnSelector> = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let s = s.trim_matches(|c: char| c == '"' || c == '\'');
            match s.parse::<usize>() {
                Ok(i) => ColumnSelector::Position(i),
                Err(_) => ColumnSelector::Name(s.to_string()),
            }
        })
        .collect();
    (!selectors.is_empty()).then_some(selectors)
}

impl FormState {
    /// Build a run configuration, reporting the first field that fails to parse.
    pub fn to_config(&self) -> Result<RunConfig> {
        if self.folder.trim().is_empty() {
            bail!("pick a folder first");
        }
        let bounds = if self.entire_bound {
            None
        } else {
            Some((
                parse_f64("Lower Bound", &self.lower_bound)?,
                parse_f64("Upper Bound", &self.upper_bound)?,
            ))
        };
        let smoothing = if self.smooth {
            Smoothing::span(self.smooth_span)?
        } else {
            Smoothing::Off
        };
        let detector = if self.local_minimum {
            Detector::LocalMinimum {
                threshold: parse_f64("Scan Threshold", &self.scan_threshold)?,
            }
        } else {
            Detector::Prominence
        };

        Ok(RunConfig {
            source_dir: PathBuf::from(self.folder.trim()),
            header: self.header.clone(),
            separator: self.separator,
            blank_lines: self.blank_lines,
            columns: parse_columns(&self.columns),
            smoothing,
            bounds,
            graph: self.graph,
            threshold: parse_f64("Threshold", &self.threshold)?,
            min_height: parse_f64("Min Height", &self.min_height)?,
            direction: if self.peak { Direction::Peak } else { Direction::Valley },
            detector,
        })
    }

    /// Fill the form from a saved configuration.
    pub fn from_config(cfg: &RunConfig) -> Self {
        let (entire_bound, lower_bound, upper_bound) = match cfg.bounds {
            Some((lo, hi)) => (false, lo.to_string(), hi.to_string()),
            None => (true, String::new(), String::new()),
        };
        let (smooth, smooth_span) = match cfg.smoothing {
            Smoothing::Off => (false, Smoothing::DEFAULT_SPAN),
            Smoothing::Span(span) => (true, span),
        };
        let (local_minimum, scan_threshold) = match cfg.detector {
            Detector::Prominence => (false, DEFAULT_SCAN_THRESHOLD),
            Detector::LocalMinimum { threshold } => (true, threshold),
        };
        let columns = cfg
            .columns
            .as_ref()
            .map(|cols| {
                cols.iter()
                    .map(|c| match c {
                        ColumnSelector::Position(i) => i.to_string(),
                        ColumnSelector::Name(n) => n.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        Self {
            folder: cfg.source_dir.display().to_string(),
            header: cfg.header.clone(),
            separator: cfg.separator,
            blank_lines: cfg.blank_lines,
            columns,
            smooth,
            smooth_span,
            entire_bound,
            lower_bound,
            upper_bound,
            graph: cfg.graph,
            threshold: cfg.threshold.to_string(),
            min_height: cfg.min_height.to_string(),
            peak: cfg.direction == Direction::Peak,
            local_minimum,
            scan_threshold: scan_threshold.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The analysis shown in the preview plot.
pub struct Preview {
    pub title: String,
    pub analysis: Analysis,
    pub direction: Direction,
}

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    pub form: FormState,

    /// Result of the last batch run.
    pub batch: Option<BatchSummary>,

    /// First successful pass of the last run.
    pub preview: Option<Preview>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Parse the form and process the whole folder.
    pub fn run(&mut self) {
        let config = match self.form.to_config() {
            Ok(cfg) => cfg,
            Err(e) => {
                log::error!("Invalid parameters: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
                return;
            }
        };

        match run_batch(&config) {
            Ok(batch) => {
                self.preview = batch.items.iter().find_map(|item| {
                    let outcome = item.result.as_ref().ok()?;
                    Some(Preview {
                        title: format!("{} [{}]", item.source.display(), item.column),
                        analysis: outcome.analysis.clone(),
                        direction: effective_direction(&config),
                    })
                });
                self.status_message = Some(format!(
                    "{} passes ok, {} failed, {} peaks written",
                    batch.succeeded(),
                    batch.failed(),
                    batch.peaks()
                ));
                self.batch = Some(batch);
            }
            Err(e) => {
                log::error!("Batch failed: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    pub fn load_config(&mut self, path: &Path) {
        match RunConfig::from_json_file(path) {
            Ok(cfg) => {
                log::info!("Loaded parameters from {}", path.display());
                self.form = FormState::from_config(&cfg);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    pub fn save_config(&mut self, path: &Path) {
        let saved = self
            .form
            .to_config()
            .and_then(|cfg| Ok(cfg.to_json_file(path)?));
        if let Err(e) = saved {
            log::error!("Failed to save {}: {e:#}", path.display());
            self.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_accept_list_syntax() {
        assert_eq!(parse_columns(""), None);
        assert_eq!(
            parse_columns("[0, 2]"),
            Some(vec![ColumnSelector::Position(0), ColumnSelector::Position(2)])
        );
        assert_eq!(
            parse_columns("'Current/A', 1"),
            Some(vec![ColumnSelector::Name("Current/A".into()), ColumnSelector::Position(1)])
        );
    }

    #[test]
    fn form_round_trips_through_config() {
        let form = FormState {
            folder: "/data/cv".into(),
            columns: "1, 3".into(),
            smooth: true,
            smooth_span: 15,
            entire_bound: false,
            lower_bound: "-0.2".into(),
            upper_bound: "0.6".into(),
            peak: true,
            ..FormState::default()
        };
        let cfg = form.to_config().unwrap();
        assert_eq!(cfg.bounds, Some((-0.2, 0.6)));
        assert_eq!(cfg.smoothing, Smoothing::Span(15));
        assert_eq!(cfg.direction, Direction::Peak);
        assert_eq!(FormState::from_config(&cfg), form);
    }

    #[test]
    fn unchecked_peak_means_valley() {
        let form = FormState {
            folder: "x".into(),
            ..FormState::default()
        };
        assert_eq!(form.to_config().unwrap().direction, Direction::Valley);
    }

    #[test]
    fn bad_number_names_the_field() {
        let form = FormState {
            folder: "x".into(),
            threshold: "abc".into(),
            ..FormState::default()
        };
        let err = form.to_config().unwrap_err();
        assert!(format!("{err:#}").contains("Threshold"));
    }
}

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::config::{Detector, RunConfig};
use crate::data::loader::load_file;
use crate::data::model::{ColumnSelector, Table};
use crate::data::reformat::{self, Artifact};
use crate::plot::{self, PeakMarker, sci_label};
use crate::report::{self, ReportTarget};
use crate::signal::summary::{self, local_minimum_positions};
use crate::signal::{self, Direction, Filtered};

// ---------------------------------------------------------------------------
// Workspace – output folders next to the raw exports
// ---------------------------------------------------------------------------

/// Output layout of one source folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub source_dir: PathBuf,
    /// Rendered PNGs.
    pub figures: PathBuf,
    /// Append-only peak summaries.
    pub summary: PathBuf,
    /// Normalized `f-<stem>.csv` copies of the raw exports.
    pub formatted: PathBuf,
}

impl Workspace {
    /// Create `figures/`, `summary/` and `formatted/` if they are missing.
    pub fn bootstrap(source_dir: &Path) -> Result<Self> {
        let ws = Workspace {
            source_dir: source_dir.to_path_buf(),
            figures: source_dir.join("figures"),
            summary: source_dir.join("summary"),
            formatted: source_dir.join("formatted"),
        };
        for dir in [&ws.figures, &ws.summary, &ws.formatted] {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(ws)
    }

    /// `summary-<stem>.csv` for all columns, `summary-<stem>-<tag>.csv` for one.
    ///
    /// An all-columns report carries every value column on each row, but the
    /// `prominence` belongs to the column the peak was found in. Rows are
    /// grouped by that column in column order, then by position within it;
    /// they are not merged into one index order. Per-column runs avoid the
    /// ambiguity.
    pub fn report_target(&self, stem: &str, selector: Option<&ColumnSelector>) -> ReportTarget {
        let name = match selector {
            None => format!("summary-{stem}.csv"),
            Some(sel) => format!("summary-{stem}-{}.csv", column_tag(Some(sel))),
        };
        ReportTarget::new(self.summary.join(name))
    }

    pub fn figure_path(&self, stem: &str, selector: Option<&ColumnSelector>) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        self.figures
            .join(plot::figure_name(&column_tag(selector), stem, &timestamp))
    }
}

/// File-name-safe tag for a column selection.
pub fn column_tag(selector: Option<&ColumnSelector>) -> String {
    match selector {
        None => "all".to_string(),
        Some(ColumnSelector::Position(i)) => i.to_string(),
        Some(ColumnSelector::Name(name)) => name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Analysis of one column selection
// ---------------------------------------------------------------------------

/// Detection result for one value column of a prepared series.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnResult {
    /// Position within the prepared series.
    pub column: usize,
    pub name: String,
    pub candidates: Vec<usize>,
    pub filtered: Filtered,
    /// Mean of the column over the analysed range.
    pub baseline: Option<f64>,
    /// Max (peaks) or min (valleys) of the column.
    pub extent: Option<f64>,
}

impl ColumnResult {
    /// `i1/A: 2 peaks, baseline -1.20e-07, extent -5.00e-06`
    pub fn describe(&self) -> String {
        let show = |v: Option<f64>| v.map(sci_label).unwrap_or_else(|| "n/a".to_string());
        format!(
            "{}: {} peaks, baseline {}, extent {}",
            self.name,
            self.filtered.len(),
            show(self.baseline),
            show(self.extent)
        )
    }
}

/// Preprocessed series plus the per-column detections on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub series: Table,
    pub columns: Vec<ColumnResult>,
}

impl Analysis {
    pub fn peak_count(&self) -> usize {
        self.columns.iter().map(|c| c.filtered.len()).sum()
    }

    /// Plot markers for every column, `direction` giving the line orientation.
    pub fn markers(&self, direction: Direction) -> Vec<PeakMarker> {
        self.columns
            .iter()
            .flat_map(|c| plot::annotate(&self.series, c.column, &c.filtered, direction))
            .collect()
    }
}

/// Direction the prominences of `detector` hits are measured in.
pub fn effective_direction(config: &RunConfig) -> Direction {
    match config.detector {
        Detector::Prominence => config.direction,
        Detector::LocalMinimum { .. } => Direction::Valley,
    }
}

/// Candidates then prominence filter for one column of values.
pub fn detect_and_filter(values: &[f64], config: &RunConfig) -> (Vec<usize>, Filtered) {
    let direction = effective_direction(config);
    let candidates = match config.detector {
        Detector::Prominence => signal::detect(values, config.min_height, direction),
        Detector::LocalMinimum { threshold } => local_minimum_positions(values, threshold),
    };
    let filtered = signal::filter(values, &candidates, config.threshold, direction);
    (candidates, filtered)
}

/// Prepare `table` for `selector` (all columns when `None`) and run
/// detection on every resulting column. Pure; nothing is written.
pub fn analyze(
    table: &Table,
    selector: Option<&ColumnSelector>,
    config: &RunConfig,
) -> crate::error::Result<Analysis> {
    let selection = selector.map(std::slice::from_ref);
    let series = signal::prepare(table, config.bounds, selection, config.smoothing)?;

    let direction = effective_direction(config);
    let baselines = summary::baseline(&series, None);
    let extents = summary::extent(&series, direction);

    let columns = (0..series.columns.len())
        .map(|c| {
            let (candidates, filtered) = detect_and_filter(series.column(c), config);
            ColumnResult {
                column: c,
                name: series.columns[c].clone(),
                candidates,
                filtered,
                baseline: baselines[c],
                extent: extents[c],
            }
        })
        .collect();

    Ok(Analysis { series, columns })
}

// ---------------------------------------------------------------------------
// Persisting one pass
// ---------------------------------------------------------------------------

/// What one (file, column selection) pass produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutcome {
    pub analysis: Analysis,
    pub report: PathBuf,
    pub rows_appended: usize,
    pub figure: Option<PathBuf>,
}

/// Save the figure (if asked) and append the analysis to its report.
///
/// The figure goes first: a pass whose figure cannot be written fails
/// without leaving rows in the report.
pub fn persist(
    analysis: Analysis,
    workspace: &Workspace,
    stem: &str,
    selector: Option<&ColumnSelector>,
    config: &RunConfig,
) -> Result<PassOutcome> {
    let figure = if config.graph {
        let path = workspace.figure_path(stem, selector);
        let markers = analysis.markers(effective_direction(config));
        plot::render_png(&analysis.series, &markers, &path)
            .with_context(|| format!("rendering {}", path.display()))?;
        Some(path)
    } else {
        None
    };

    let target = workspace.report_target(stem, selector);
    let header = report::header_for(&analysis.series);

    let records: Vec<_> = analysis
        .columns
        .iter()
        .flat_map(|c| report::build_records(&analysis.series, &c.filtered, config.min_height))
        .collect();
    let rows_appended = target
        .append(&header, &records)
        .with_context(|| format!("appending to {}", target.path.display()))?;

    Ok(PassOutcome {
        analysis,
        report: target.path,
        rows_appended,
        figure,
    })
}

// ---------------------------------------------------------------------------
// Files and batches
// ---------------------------------------------------------------------------

/// One batch item: a source file and the column selection it ran with.
#[derive(Debug)]
pub struct BatchItem {
    pub source: PathBuf,
    pub column: String,
    /// Error text carries the file and column context.
    pub result: std::result::Result<PassOutcome, String>,
}

impl BatchItem {
    fn failed(source: &Path, column: String, err: anyhow::Error) -> Self {
        let message = format!("{err:#}");
        log::warn!("skipping {} [{column}]: {message}", source.display());
        BatchItem {
            source: source.to_path_buf(),
            column,
            result: Err(message),
        }
    }
}

/// Outcome of [`run_batch`].
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub items: Vec<BatchItem>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    pub fn peaks(&self) -> usize {
        self.items
            .iter()
            .filter_map(|i| i.result.as_ref().ok())
            .map(|o| o.rows_appended)
            .sum()
    }
}

fn is_parquet(path: &Path) -> bool {
    matches!(extension(path).as_str(), "parquet" | "pq")
}

/// Stem every output of `source` is named after: `f-<stem>`, commas dropped.
///
/// The extension is not part of it, so `run.txt` and `run.csv` share one.
pub fn output_stem(source: &Path) -> String {
    let name = reformat::formatted_name(source);
    name.trim_end_matches(".csv").to_string()
}

/// Normalize (text exports only) and load one source file.
pub fn load_source(source: &Path, config: &RunConfig, workspace: &Workspace) -> Result<(Table, String)> {
    let artifact = if is_parquet(source) {
        Artifact {
            path: source.to_path_buf(),
        }
    } else {
        reformat::normalize(source, &config.reformat_options(), &workspace.formatted)?
    };
    let table = load_file(&artifact.path)
        .with_context(|| format!("loading {}", artifact.path.display()))?;
    Ok((table, output_stem(source)))
}

/// Run every configured column selection over one source file.
///
/// Each selection is its own batch item: a failure in one does not stop the
/// others, and reports already written stay as they are.
pub fn process_file(source: &Path, config: &RunConfig, workspace: &Workspace) -> Vec<BatchItem> {
    let selectors: Vec<Option<&ColumnSelector>> = match &config.columns {
        Some(cols) => cols.iter().map(Some).collect(),
        None => vec![None],
    };

    let (table, stem) = match load_source(source, config, workspace) {
        Ok(loaded) => loaded,
        Err(e) => {
            return vec![BatchItem::failed(source, "*".to_string(), e)];
        }
    };

    selectors
        .into_iter()
        .map(|sel| {
            let tag = column_tag(sel);
            let result = analyze(&table, sel, config)
                .map_err(anyhow::Error::from)
                .and_then(|analysis| persist(analysis, workspace, &stem, sel, config))
                .with_context(|| format!("{} column {tag}", source.display()));
            match result {
                Ok(outcome) => {
                    log::info!(
                        "{} [{tag}]: {} peaks",
                        source.display(),
                        outcome.rows_appended
                    );
                    for column in &outcome.analysis.columns {
                        log::debug!("{}", column.describe());
                    }
                    BatchItem {
                        source: source.to_path_buf(),
                        column: tag,
                        result: Ok(outcome),
                    }
                }
                Err(e) => BatchItem::failed(source, tag, e),
            }
        })
        .collect()
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Raw exports in `dir`: regular files with a supported extension, by name.
pub fn list_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if matches!(extension(&path).as_str(), "txt" | "csv" | "parquet" | "pq") {
            files.push(path);
        } else {
            log::debug!("ignoring {}", path.display());
        }
    }
    files.sort();
    Ok(files)
}

/// Process every export in `config.source_dir`, one file at a time.
///
/// Sequential processing is what keeps each report single-writer. A source
/// whose [`output_stem`] was already claimed by an earlier file (in name
/// order) fails as a whole, so two files never share a report.
pub fn run_batch(config: &RunConfig) -> Result<BatchSummary> {
    let workspace = Workspace::bootstrap(&config.source_dir)?;
    let sources = list_sources(&config.source_dir)?;
    log::info!("processing {} files in {}", sources.len(), config.source_dir.display());

    let mut claimed: HashMap<String, &Path> = HashMap::new();
    let mut batch = BatchSummary::default();
    for source in &sources {
        let stem = output_stem(source);
        if let Some(owner) = claimed.get(&stem) {
            let err = anyhow!(
                "outputs named '{stem}' already belong to {}; rename one of the files",
                owner.display()
            );
            batch.items.push(BatchItem::failed(source, "*".to_string(), err));
            continue;
        }
        claimed.insert(stem, source);
        batch.items.extend(process_file(source, config, &workspace));
    }
    log::info!(
        "batch done: {} ok, {} failed, {} peaks",
        batch.succeeded(),
        batch.failed(),
        batch.peaks()
    );
    Ok(batch)
}

//! Whole-folder runs over instrument-style text exports.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use ec_peaks::pipeline::list_sources;
use ec_peaks::report::ReportTarget;
use ec_peaks::{ColumnSelector, Direction, RunConfig, run_batch};
use tempfile::TempDir;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// 41 rows from 0.40 V down to 0.00 V. `i1/A` dips at rows 10 and 30,
/// `i2/A` at row 20.
fn write_export(dir: &Path, name: &str) {
    let mut out = String::from("Cyclic Voltammetry\nInstrument Model:  CHI660E\nScan Rate (V/s) = 0.05\n\n");
    out.push_str("Potential/V\ti1/A\ti2/A\n\n");
    for row in 0..=40 {
        let x = row as f64;
        let e = 0.4 - 0.01 * x;
        let i1 = gaussian(x, 10.0, 3.0, -5.0e-6) + gaussian(x, 30.0, 3.0, -3.0e-6);
        let i2 = gaussian(x, 20.0, 3.0, -2.0e-6);
        let _ = writeln!(out, "{e:.3}\t{i1:e}\t{i2:e}");
    }
    fs::write(dir.join(name), out).expect("write export");
}

fn config(dir: &Path) -> RunConfig {
    RunConfig {
        source_dir: dir.to_path_buf(),
        separator: ec_peaks::data::reformat::Separator::Tab,
        direction: Direction::Valley,
        ..RunConfig::default()
    }
}

fn png_count(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "png"))
        .count()
}

#[test]
fn all_columns_land_in_one_report() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write_export(dir.path(), "scan_01.txt");

    let batch = run_batch(&config(dir.path())).unwrap();
    assert_eq!(batch.items.len(), 1);
    assert_eq!(batch.failed(), 0);
    assert_eq!(batch.peaks(), 3);

    let report = dir.path().join("summary").join("summary-f-scan_01.csv");
    let (header, records) = ReportTarget::new(&report).read().unwrap();
    assert_eq!(header, vec!["Potential/V", "i1/A", "i2/A", "prominence", "height"]);
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.height == 1e-7));
    assert!(records.iter().all(|r| r.prominence > 1e-8));

    // grouped by the column each peak was found in: i1/A first, then i2/A
    let potentials: Vec<f64> = records.iter().map(|r| r.index).collect();
    assert_eq!(potentials, vec![0.3, 0.1, 0.2]);

    assert!(dir.path().join("formatted").join("f-scan_01.csv").is_file());
    assert_eq!(png_count(&dir.path().join("figures")), 0);
}

#[test]
fn raw_exports_are_left_untouched() {
    let dir = TempDir::new().unwrap();
    write_export(dir.path(), "scan_01.txt");
    let before = fs::read(dir.path().join("scan_01.txt")).unwrap();

    run_batch(&config(dir.path())).unwrap();
    assert_eq!(fs::read(dir.path().join("scan_01.txt")).unwrap(), before);
}

#[test]
fn rerun_appends_under_the_same_header() {
    let dir = TempDir::new().unwrap();
    write_export(dir.path(), "scan_01.txt");
    let cfg = config(dir.path());

    run_batch(&cfg).unwrap();
    run_batch(&cfg).unwrap();

    let report = dir.path().join("summary").join("summary-f-scan_01.csv");
    let text = fs::read_to_string(&report).unwrap();
    assert_eq!(text.matches("prominence").count(), 1);
    assert_eq!(ReportTarget::new(&report).read().unwrap().1.len(), 6);
}

#[test]
fn selected_columns_get_their_own_reports_and_figures() {
    let dir = TempDir::new().unwrap();
    write_export(dir.path(), "scan_01.txt");
    let cfg = RunConfig {
        columns: Some(vec![ColumnSelector::Position(0), ColumnSelector::Name("i2/A".into())]),
        graph: true,
        ..config(dir.path())
    };

    let batch = run_batch(&cfg).unwrap();
    assert_eq!(batch.succeeded(), 2);

    let summary = dir.path().join("summary");
    let (header, first) = ReportTarget::new(summary.join("summary-f-scan_01-0.csv")).read().unwrap();
    assert_eq!(header, vec!["Potential/V", "i1/A", "prominence", "height"]);
    assert_eq!(first.len(), 2);
    let (_, second) = ReportTarget::new(summary.join("summary-f-scan_01-i2_A.csv")).read().unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].index, 0.2);

    assert_eq!(png_count(&dir.path().join("figures")), 2);
    for item in &batch.items {
        let figure = item.result.as_ref().unwrap().figure.as_ref().unwrap();
        assert!(figure.is_file());
    }
}

#[test]
fn a_bad_column_does_not_stop_the_others() {
    let dir = TempDir::new().unwrap();
    write_export(dir.path(), "scan_01.txt");
    let cfg = RunConfig {
        columns: Some(vec![ColumnSelector::Name("missing".into()), ColumnSelector::Position(0)]),
        ..config(dir.path())
    };

    let batch = run_batch(&cfg).unwrap();
    assert_eq!(batch.items.len(), 2);
    assert_eq!(batch.failed(), 1);

    let err = batch.items[0].result.as_ref().unwrap_err();
    assert!(err.contains("missing"), "{err}");
    assert!(!dir.path().join("summary").join("summary-f-scan_01-missing.csv").exists());

    let ok = batch.items[1].result.as_ref().unwrap();
    assert_eq!(ok.rows_appended, 2);
}

#[test]
fn empty_bounds_write_a_header_only_report() {
    let dir = TempDir::new().unwrap();
    write_export(dir.path(), "scan_01.txt");
    let cfg = RunConfig {
        bounds: Some((5.0, 6.0)),
        graph: true,
        ..config(dir.path())
    };

    let batch = run_batch(&cfg).unwrap();
    assert_eq!(batch.failed(), 0);
    assert_eq!(batch.peaks(), 0);

    let report = dir.path().join("summary").join("summary-f-scan_01.csv");
    let (header, records) = ReportTarget::new(&report).read().unwrap();
    assert_eq!(header.len(), 5);
    assert!(records.is_empty());
}

#[test]
fn only_supported_exports_are_listed() {
    let dir = TempDir::new().unwrap();
    write_export(dir.path(), "b.txt");
    write_export(dir.path(), "a.csv");
    fs::write(dir.path().join("notes.md"), "not data").unwrap();
    fs::create_dir(dir.path().join("sub.txt")).unwrap();

    let names: Vec<String> = list_sources(dir.path())
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.csv", "b.txt"]);
}

fn write_table(path: &Path, index: Vec<f64>, values: Vec<f64>) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("E/V", DataType::Float64, false),
        Field::new("i/A", DataType::Float64, false),
    ]));
    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(Float64Array::from(index)),
        Arc::new(Float64Array::from(values)),
    ];
    let batch = RecordBatch::try_new(schema.clone(), arrays).unwrap();
    let mut writer = ArrowWriter::try_new(fs::File::create(path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

#[test]
fn parquet_tables_skip_formatting() {
    let dir = TempDir::new().unwrap();
    write_table(
        &dir.path().join("trace.parquet"),
        vec![0.0, 0.1, 0.2, 0.3, 0.4],
        vec![0.0, 5.0, 0.0, 7.0, 0.0],
    );
    let cfg = RunConfig {
        source_dir: dir.path().to_path_buf(),
        threshold: 0.0,
        min_height: 1.0,
        ..RunConfig::default()
    };

    let batch = run_batch(&cfg).unwrap();
    assert_eq!(batch.succeeded(), 1);
    assert_eq!(batch.peaks(), 2);

    let (header, records) = ReportTarget::new(dir.path().join("summary").join("summary-f-trace.csv"))
        .read()
        .unwrap();
    assert_eq!(header, vec!["E/V", "i/A", "prominence", "height"]);
    assert_eq!(records.iter().map(|r| r.prominence).collect::<Vec<_>>(), vec![5.0, 7.0]);
    assert_eq!(fs::read_dir(dir.path().join("formatted")).unwrap().count(), 0);
}

#[test]
fn sources_sharing_a_stem_never_share_a_report() {
    let dir = TempDir::new().unwrap();
    write_export(dir.path(), "run.txt");
    write_export(dir.path(), "run.csv");
    write_table(&dir.path().join("run.parquet"), vec![0.0, 1.0, 2.0], vec![0.0, -9.0, 0.0]);

    let batch = run_batch(&config(dir.path())).unwrap();
    assert_eq!(batch.items.len(), 3);
    assert_eq!(batch.succeeded(), 1);

    // name order: run.csv claims the stem, the others are refused
    assert!(batch.items[0].source.ends_with("run.csv"));
    assert!(batch.items[0].result.is_ok());
    for item in &batch.items[1..] {
        let err = item.result.as_ref().unwrap_err();
        assert!(err.contains("run.csv"), "{err}");
    }

    let (_, records) = ReportTarget::new(dir.path().join("summary").join("summary-f-run.csv"))
        .read()
        .unwrap();
    assert_eq!(records.len(), 3);
}

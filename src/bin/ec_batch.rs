//! Headless batch runner: `ec_batch <config.json>`.
//!
//! Without an argument it prints a default configuration to start from.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use ec_peaks::{RunConfig, run_batch};

fn main() -> Result<()> {
    env_logger::init();

    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: ec_batch <config.json>");
        println!("{}", serde_json::to_string_pretty(&RunConfig::default())?);
        return Ok(());
    };

    let config = RunConfig::from_json_file(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let batch = run_batch(&config)?;

    for item in &batch.items {
        match &item.result {
            Ok(outcome) => {
                println!(
                    "{} [{}]: {} peaks -> {}",
                    item.source.display(),
                    item.column,
                    outcome.rows_appended,
                    outcome.report.display()
                );
                for column in &outcome.analysis.columns {
                    println!("    {}", column.describe());
                }
            }
            Err(message) => log::error!("{} [{}]: {message}", item.source.display(), item.column),
        }
    }

    if batch.failed() > 0 {
        bail!("{} of {} passes failed", batch.failed(), batch.items.len());
    }
    Ok(())
}

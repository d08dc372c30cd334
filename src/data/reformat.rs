use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Instrument export → plain CSV
// ---------------------------------------------------------------------------

/// Keyword that marks the column-header line in the lab's exports.
pub const DEFAULT_HEADER: &str = "Potential/V";

/// Field separator used by the instrument export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    #[default]
    Comma,
    Tab,
}

impl Separator {
    pub fn as_char(self) -> char {
        match self {
            Separator::Comma => ',',
            Separator::Tab => '\t',
        }
    }
}

/// Options for turning a raw export into a loadable CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReformatOptions {
    pub separator: Separator,
    /// Text that identifies the header line.
    pub header: String,
    /// Lines between the header and the first data row.
    pub blank_lines: usize,
}

impl Default for ReformatOptions {
    fn default() -> Self {
        Self {
            separator: Separator::Comma,
            header: DEFAULT_HEADER.to_string(),
            blank_lines: 1,
        }
    }
}

/// A file produced by one reformatting stage. Stages never touch their input;
/// each returns a descriptor for the new file instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
}

/// Name of the normalized CSV for a raw export: `f-<stem>.csv`, commas dropped.
pub fn formatted_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed");
    format!("f-{}.csv", stem.replace(',', ""))
}

/// Replace every separator with `", "`.
pub fn convert_delimiter(text: &str, separator: Separator) -> String {
    text.replace(separator.as_char(), ", ")
}

/// 0-based number of the first line containing `keyword`, or the line count
/// when no line matches.
pub fn find_header_line(text: &str, keyword: &str) -> usize {
    text.lines()
        .position(|line| line.contains(keyword))
        .unwrap_or_else(|| text.lines().count())
}

/// Keep the header line and the data that starts `blank_lines` lines after
/// it; metadata above the header and empty lines are dropped.
pub fn strip_metadata(text: &str, keyword: &str, blank_lines: usize) -> String {
    let header_at = find_header_line(text, keyword);
    let mut lines = text.lines().skip(header_at);

    let mut out = String::new();
    if let Some(header) = lines.next() {
        out.push_str(header.trim_end());
        out.push('\n');
    }
    for line in lines.skip(blank_lines) {
        if line.trim().is_empty() {
            continue;
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Run the whole chain on `source` and write `f-<stem>.csv` into `out_dir`.
pub fn normalize(source: &Path, options: &ReformatOptions, out_dir: &Path) -> Result<Artifact> {
    let raw = fs::read_to_string(source)
        .with_context(|| format!("reading raw export {}", source.display()))?;

    let delimited = convert_delimiter(&raw, options.separator);
    let stripped = strip_metadata(&delimited, &options.header, options.blank_lines);

    let path = out_dir.join(formatted_name(source));
    fs::write(&path, stripped).with_context(|| format!("writing {}", path.display()))?;
    log::debug!("normalized {} -> {}", source.display(), path.display());

    Ok(Artifact { path })
}

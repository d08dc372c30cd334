/// Data layer: table model, export reformatting, and loading.
///
/// Architecture:
/// ```text
///  raw instrument export (.txt, tab or comma)
///        │
///        ▼
///   ┌──────────┐
///   │ reformat  │  delimiter → ", ", strip metadata → f-<stem>.csv
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse csv / parquet → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  index column + value columns
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod reformat;

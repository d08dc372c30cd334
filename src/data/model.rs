use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PeakError, Result};

// ---------------------------------------------------------------------------
// ColumnSelector – how a run names the value column(s) it cares about
// ---------------------------------------------------------------------------

/// Selects a value column either by its position among the value columns
/// (the index column is not counted) or by its header name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSelector {
    Position(usize),
    Name(String),
}

impl fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSelector::Position(i) => write!(f, "#{i}"),
            ColumnSelector::Name(name) => write!(f, "'{name}'"),
        }
    }
}

impl From<usize> for ColumnSelector {
    fn from(i: usize) -> Self {
        ColumnSelector::Position(i)
    }
}

impl From<&str> for ColumnSelector {
    fn from(name: &str) -> Self {
        ColumnSelector::Name(name.to_string())
    }
}

// ---------------------------------------------------------------------------
// Table – one index column shared by any number of value columns
// ---------------------------------------------------------------------------

/// A numeric table with a labelled, monotonic index (time or potential) and
/// one or more value columns. Values are stored column-major so every
/// detection pass can borrow a contiguous `&[f64]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Header of the index column, e.g. `Potential/V`.
    pub index_name: String,
    /// Index values, one per row.
    pub index: Vec<f64>,
    /// Value column headers, in file order.
    pub columns: Vec<String>,
    /// `values[c][r]` is row `r` of column `c`.
    pub values: Vec<Vec<f64>>,
}

impl Table {
    /// Build a table, checking every column has as many rows as the index.
    pub fn new(
        index_name: impl Into<String>,
        index: Vec<f64>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self> {
        let (names, values): (Vec<String>, Vec<Vec<f64>>) = columns.into_iter().unzip();
        for (name, col) in names.iter().zip(&values) {
            if col.len() != index.len() {
                return Err(PeakError::RaggedColumn {
                    column: name.clone(),
                    expected: index.len(),
                    found: col.len(),
                });
            }
        }
        Ok(Table {
            index_name: index_name.into(),
            index,
            columns: names,
            values,
        })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Values of the value column at `position`.
    pub fn column(&self, position: usize) -> &[f64] {
        &self.values[position]
    }

    /// Resolve a selector to a value-column position.
    pub fn position_of(&self, selector: &ColumnSelector) -> Result<usize> {
        let found = match selector {
            ColumnSelector::Position(i) => (*i < self.columns.len()).then_some(*i),
            ColumnSelector::Name(name) => self.columns.iter().position(|c| c == name),
        };
        found.ok_or_else(|| PeakError::MissingColumn {
            selector: selector.to_string(),
            available: self.columns.clone(),
        })
    }

    /// All value columns at row `row`, in column order.
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.values.iter().map(|col| col[row]).collect()
    }

    /// Keep only the rows whose positions are listed (in the given order).
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        Table {
            index_name: self.index_name.clone(),
            index: rows.iter().map(|&r| self.index[r]).collect(),
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|col| rows.iter().map(|&r| col[r]).collect())
                .collect(),
        }
    }

    /// Keep only the listed value columns (in the given order).
    pub fn take_columns(&self, positions: &[usize]) -> Table {
        Table {
            index_name: self.index_name.clone(),
            index: self.index.clone(),
            columns: positions.iter().map(|&p| self.columns[p].clone()).collect(),
            values: positions.iter().map(|&p| self.values[p].clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            "Potential/V",
            vec![0.0, 0.1, 0.2],
            vec![
                ("i1/A".to_string(), vec![1.0, 2.0, 3.0]),
                ("i2/A".to_string(), vec![4.0, 5.0, 6.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let err = Table::new("t", vec![0.0, 1.0], vec![("a".to_string(), vec![1.0])]);
        assert!(matches!(err, Err(PeakError::RaggedColumn { found: 1, .. })));
    }

    #[test]
    fn selectors_resolve_by_position_and_name() {
        let t = sample();
        assert_eq!(t.position_of(&ColumnSelector::Position(1)).unwrap(), 1);
        assert_eq!(t.position_of(&"i1/A".into()).unwrap(), 0);
        assert!(matches!(
            t.position_of(&ColumnSelector::Position(2)),
            Err(PeakError::MissingColumn { .. })
        ));
        assert!(t.position_of(&"nope".into()).is_err());
    }

    #[test]
    fn take_rows_and_columns() {
        let t = sample();
        let rows = t.take_rows(&[2, 0]);
        assert_eq!(rows.index, vec![0.2, 0.0]);
        assert_eq!(rows.values[1], vec![6.0, 4.0]);

        let cols = t.take_columns(&[1]);
        assert_eq!(cols.columns, vec!["i2/A".to_string()]);
        assert_eq!(cols.row(1), vec![5.0]);
    }

    #[test]
    fn selector_deserializes_from_int_or_string() {
        let sel: Vec<ColumnSelector> = serde_json::from_str(r#"[2, "i1/A"]"#).unwrap();
        assert_eq!(sel, vec![ColumnSelector::Position(2), ColumnSelector::Name("i1/A".into())]);
    }
}

use serde::{Deserialize, Serialize};

use crate::data::model::{ColumnSelector, Table};
use crate::error::{PeakError, Result};

// ---------------------------------------------------------------------------
// Smoothing
// ---------------------------------------------------------------------------

/// Exponentially weighted smoothing, off or with a span in samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Option<usize>", into = "Option<usize>")]
pub enum Smoothing {
    #[default]
    Off,
    Span(usize),
}

impl Smoothing {
    /// Span used when smoothing is switched on without a value.
    pub const DEFAULT_SPAN: usize = 5;

    /// Smoothing with the given span; a zero span is rejected.
    pub fn span(span: usize) -> Result<Self> {
        if span == 0 {
            return Err(PeakError::InvalidSmoothingSpan(span));
        }
        Ok(Smoothing::Span(span))
    }
}

impl TryFrom<Option<usize>> for Smoothing {
    type Error = PeakError;

    fn try_from(value: Option<usize>) -> Result<Self> {
        match value {
            None => Ok(Smoothing::Off),
            Some(span) => Smoothing::span(span),
        }
    }
}

impl From<Smoothing> for Option<usize> {
    fn from(value: Smoothing) -> Self {
        match value {
            Smoothing::Off => None,
            Smoothing::Span(span) => Some(span),
        }
    }
}

/// Causal exponentially weighted mean with `alpha = 2 / (span + 1)`.
///
/// Uses the bias-adjusted form: each output is the weighted average of the
/// current and all earlier samples, weights `(1 - alpha)^age`. NaN samples
/// contribute nothing but still age the earlier weights.
pub fn ewm_mean(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    values
        .iter()
        .map(|&v| {
            numerator *= decay;
            denominator *= decay;
            if !v.is_nan() {
                numerator += v;
                denominator += 1.0;
            }
            if denominator > 0.0 {
                numerator / denominator
            } else {
                f64::NAN
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Series preprocessing
// ---------------------------------------------------------------------------

/// Rows whose index lies in `[lo, hi]` (inclusive). `lo > hi` keeps nothing.
pub fn within_bounds(table: &Table, (lo, hi): (f64, f64)) -> Table {
    let rows: Vec<usize> = table
        .index
        .iter()
        .enumerate()
        .filter(|&(_, &x)| x >= lo && x <= hi)
        .map(|(r, _)| r)
        .collect();
    table.take_rows(&rows)
}

/// Restrict, select and smooth a table for one detection pass.
///
/// Steps run in this order: bounds, column selection, smoothing. Each step
/// is skipped when its argument is absent / `Off`. The input is never
/// modified; a fresh table is returned.
pub fn prepare(
    table: &Table,
    bounds: Option<(f64, f64)>,
    columns: Option<&[ColumnSelector]>,
    smoothing: Smoothing,
) -> Result<Table> {
    let mut out = match bounds {
        Some(b) => within_bounds(table, b),
        None => table.clone(),
    };

    if let Some(selectors) = columns {
        let positions = selectors
            .iter()
            .map(|s| out.position_of(s))
            .collect::<Result<Vec<_>>>()?;
        out = out.take_columns(&positions);
    }

    if let Smoothing::Span(span) = smoothing {
        for col in &mut out.values {
            *col = ewm_mean(col, span);
        }
    }

    log::debug!(
        "prepared {} rows x {} columns (bounds {:?}, smoothing {:?})",
        out.len(),
        out.columns.len(),
        bounds,
        smoothing
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(
            "E/V",
            vec![0.0, 0.1, 0.2, 0.3, 0.4],
            vec![
                ("a".to_string(), vec![1.0, 2.0, 3.0, 4.0, 5.0]),
                ("b".to_string(), vec![5.0, 4.0, 3.0, 2.0, 1.0]),
            ],
        )
        .unwrap()
    }

    fn variance(v: &[f64]) -> f64 {
        let mean = v.iter().sum::<f64>() / v.len() as f64;
        v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / v.len() as f64
    }

    #[test]
    fn noop_prepare_is_identity() {
        let t = table();
        assert_eq!(prepare(&t, None, None, Smoothing::Off).unwrap(), t);
    }

    #[test]
    fn bounds_are_inclusive() {
        let out = prepare(&table(), Some((0.1, 0.3)), None, Smoothing::Off).unwrap();
        assert_eq!(out.index, vec![0.1, 0.2, 0.3]);
        assert_eq!(out.values[1], vec![4.0, 3.0, 2.0]);
    }

    #[test]
    fn empty_bounds_give_empty_table() {
        let out = prepare(&table(), Some((5.0, 6.0)), None, Smoothing::Off).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.columns.len(), 2);

        let inverted = prepare(&table(), Some((0.3, 0.1)), None, Smoothing::Off).unwrap();
        assert!(inverted.is_empty());
    }

    #[test]
    fn column_selection_and_missing_column() {
        let out = prepare(&table(), None, Some(&["b".into()]), Smoothing::Off).unwrap();
        assert_eq!(out.columns, vec!["b".to_string()]);

        let err = prepare(&table(), None, Some(&[ColumnSelector::Position(7)]), Smoothing::Off);
        assert!(matches!(err, Err(PeakError::MissingColumn { .. })));
    }

    #[test]
    fn ewm_matches_adjusted_weights() {
        // span 3 -> alpha 0.5: y1 = (2 + 0.5*1) / 1.5
        let out = ewm_mean(&[1.0, 2.0, 3.0], 3);
        assert!((out[0] - 1.0).abs() < 1e-12);
        assert!((out[1] - 2.5 / 1.5).abs() < 1e-12);
        assert!((out[2] - (3.0 + 1.0 + 0.25) / 1.75).abs() < 1e-12);
    }

    #[test]
    fn ewm_is_causal() {
        let a = ewm_mean(&[1.0, 2.0, 3.0, 4.0], 4);
        let b = ewm_mean(&[1.0, 2.0, 3.0, 100.0], 4);
        assert_eq!(a[..3], b[..3]);
    }

    #[test]
    fn span_one_is_identity() {
        let v = vec![3.0, -1.0, 4.0, 1.5];
        assert_eq!(ewm_mean(&v, 1), v);
    }

    #[test]
    fn ewm_carries_value_over_nan() {
        let out = ewm_mean(&[f64::NAN, 2.0, f64::NAN], 5);
        assert!(out[0].is_nan());
        assert!((out[1] - 2.0).abs() < 1e-12);
        assert!((out[2] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn variance_shrinks_with_span() {
        // deterministic "noise" from a cheap LCG
        let mut state: u64 = 7;
        let noisy: Vec<f64> = (0..2000)
            .map(|i| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let noise = ((state >> 11) as f64 / (1u64 << 53) as f64) - 0.5;
                (i as f64 * 0.01).sin() + noise
            })
            .collect();

        let mut last = variance(&noisy);
        for span in [2, 5, 10, 20, 40] {
            let v = variance(&ewm_mean(&noisy, span));
            assert!(v <= last, "span {span}: {v} > {last}");
            last = v;
        }
    }

    #[test]
    fn zero_span_is_rejected() {
        assert!(matches!(Smoothing::span(0), Err(PeakError::InvalidSmoothingSpan(0))));
        assert!(serde_json::from_str::<Smoothing>("0").is_err());
        assert_eq!(serde_json::from_str::<Smoothing>("null").unwrap(), Smoothing::Off);
        assert_eq!(serde_json::from_str::<Smoothing>("15").unwrap(), Smoothing::Span(15));
    }
}

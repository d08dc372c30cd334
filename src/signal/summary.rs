use super::detect::Direction;
use super::prepare::within_bounds;
use crate::data::model::Table;

/// Threshold the lab used for the simple valley scan when none is given.
pub const DEFAULT_SCAN_THRESHOLD: f64 = -0.4e-7;

// ---------------------------------------------------------------------------
// Threshold scan (alternative detector)
// ---------------------------------------------------------------------------

/// Positions `k` in `2..=n-2` where `y[k]` is a strict local minimum below
/// `threshold`. Position 1 is never scanned.
pub fn local_minimum_positions(y: &[f64], threshold: f64) -> Vec<usize> {
    (2..y.len().saturating_sub(1))
        .filter(|&k| y[k] < y[k - 1] && y[k] < y[k + 1] && y[k] < threshold)
        .collect()
}

/// `(x, y)` pairs of the strict local minima below `threshold`.
pub fn scan_local_extrema(x: &[f64], y: &[f64], threshold: f64) -> Vec<(f64, f64)> {
    local_minimum_positions(y, threshold)
        .into_iter()
        .map(|k| (x[k], y[k]))
        .collect()
}

// ---------------------------------------------------------------------------
// Reductions
// ---------------------------------------------------------------------------

fn mean(values: &[f64]) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Mean of every value column, optionally over an inclusive index range.
/// `None` for a column with no (non-NaN) samples.
pub fn baseline(table: &Table, bounds: Option<(f64, f64)>) -> Vec<Option<f64>> {
    let bounded;
    let t = match bounds {
        Some(b) => {
            bounded = within_bounds(table, b);
            &bounded
        }
        None => table,
    };
    t.values.iter().map(|col| mean(col)).collect()
}

/// Largest value for peaks, smallest for valleys, of one column.
pub fn column_extent(values: &[f64], direction: Direction) -> Option<f64> {
    let finite = values.iter().copied().filter(|v| !v.is_nan());
    match direction {
        Direction::Peak => finite.reduce(f64::max),
        Direction::Valley => finite.reduce(f64::min),
    }
}

/// [`column_extent`] of every value column.
pub fn extent(table: &Table, direction: Direction) -> Vec<Option<f64>> {
    table
        .values
        .iter()
        .map(|col| column_extent(col, direction))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_skips_position_one() {
        // minimum at 1 is outside the scanned range, minimum at 3 is inside
        let y = [0.0, -5.0, 0.0, -5.0, 0.0];
        let x = [10.0, 11.0, 12.0, 13.0, 14.0];
        assert_eq!(local_minimum_positions(&y, 0.0), vec![3]);
        assert_eq!(scan_local_extrema(&x, &y, 0.0), vec![(13.0, -5.0)]);
    }

    #[test]
    fn scan_excludes_last_position_and_respects_threshold() {
        let y = [0.0, 0.0, -1.0, 0.0, -3.0, -1.0, -9.0];
        assert_eq!(local_minimum_positions(&y, -2.0), vec![4]);
        assert_eq!(local_minimum_positions(&y, 0.0), vec![2, 4]);
    }

    #[test]
    fn scan_on_tiny_inputs() {
        assert!(local_minimum_positions(&[], 0.0).is_empty());
        assert!(local_minimum_positions(&[1.0, 0.0, 1.0], 5.0).is_empty());
        assert_eq!(local_minimum_positions(&[1.0, 1.0, 0.0, 1.0], 5.0), vec![2]);
    }

    #[test]
    fn baseline_and_extent() {
        let t = Table::new(
            "t",
            vec![0.0, 1.0, 2.0, 3.0],
            vec![("a".to_string(), vec![1.0, 3.0, f64::NAN, 8.0])],
        )
        .unwrap();

        assert_eq!(baseline(&t, None), vec![Some(4.0)]);
        assert_eq!(baseline(&t, Some((0.0, 1.0))), vec![Some(2.0)]);
        assert_eq!(baseline(&t, Some((9.0, 10.0))), vec![None]);

        assert_eq!(extent(&t, Direction::Peak), vec![Some(8.0)]);
        assert_eq!(extent(&t, Direction::Valley), vec![Some(1.0)]);
    }
}

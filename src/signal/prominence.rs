use super::detect::Direction;

// ---------------------------------------------------------------------------
// Topographic prominence
// ---------------------------------------------------------------------------

/// Prominence of each peak in `signal`.
///
/// From the peak, walk outward on each side until the signal rises above the
/// peak (or the series ends) and take the lowest point passed. The higher of
/// the two minima is the reference level; prominence is the peak's height
/// above it, and is never negative.
pub fn prominences(signal: &[f64], peaks: &[usize]) -> Vec<f64> {
    peaks
        .iter()
        .map(|&peak| {
            let top = signal[peak];

            let mut left_min = top;
            for &v in signal[..peak].iter().rev() {
                if v > top {
                    break;
                }
                left_min = left_min.min(v);
            }

            let mut right_min = top;
            for &v in &signal[peak + 1..] {
                if v > top {
                    break;
                }
                right_min = right_min.min(v);
            }

            top - left_min.max(right_min)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Threshold filter
// ---------------------------------------------------------------------------

/// Peaks that survived the prominence threshold, with their prominences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filtered {
    pub peaks: Vec<usize>,
    pub prominences: Vec<f64>,
}

impl Filtered {
    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }
}

/// Keep candidates whose prominence is strictly greater than `threshold`.
///
/// Prominence is measured on `direction.apply(values)`, the same signal the
/// detector searched. A non-positive threshold keeps every candidate.
pub fn filter(values: &[f64], candidates: &[usize], threshold: f64, direction: Direction) -> Filtered {
    let signal = direction.apply(values);
    let (peaks, prominences) = candidates
        .iter()
        .zip(prominences(&signal, candidates))
        .filter(|(_, p)| *p > threshold || threshold <= 0.0)
        .map(|(&k, p)| (k, p))
        .unzip();

    let out = Filtered { peaks, prominences };
    log::debug!(
        "{} of {} candidates above prominence {threshold:e}",
        out.len(),
        candidates.len()
    );
    out
}

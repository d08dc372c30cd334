use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Direction – peaks or valleys
// ---------------------------------------------------------------------------

/// Whether maxima (peaks) or minima (valleys) are sought.
///
/// Valleys are found as the maxima of the negated signal, so every stage
/// after this one only ever deals with maxima of `sign() * values`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Peak,
    Valley,
}

impl Direction {
    /// `+1.0` for peaks, `-1.0` for valleys.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Peak => 1.0,
            Direction::Valley => -1.0,
        }
    }

    /// `values` multiplied by [`Direction::sign`].
    pub fn apply(self, values: &[f64]) -> Vec<f64> {
        let s = self.sign();
        values.iter().map(|v| s * v).collect()
    }
}

// ---------------------------------------------------------------------------
// Extremum detection
// ---------------------------------------------------------------------------

/// Positions of strict local maxima whose value is at least `min_height`.
///
/// The first and last samples are never candidates, and a sample equal to
/// either neighbour (a plateau) is not a maximum.
pub fn local_maxima(signal: &[f64], min_height: f64) -> Vec<usize> {
    if signal.len() < 3 {
        return Vec::new();
    }
    (1..signal.len() - 1)
        .filter(|&k| {
            let v = signal[k];
            v > signal[k - 1] && v > signal[k + 1] && v >= min_height
        })
        .collect()
}

/// Candidate extrema of `values` in the given direction.
///
/// `min_height` gates the *signed* values, so for valleys a gate of `1.0`
/// keeps minima at or below `-1.0`.
pub fn detect(values: &[f64], min_height: f64, direction: Direction) -> Vec<usize> {
    let peaks = local_maxima(&direction.apply(values), min_height);
    log::debug!(
        "{} {:?} candidates over {} samples (min height {min_height:e})",
        peaks.len(),
        direction,
        values.len()
    );
    peaks
}

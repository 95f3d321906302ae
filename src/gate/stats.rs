//! Percentile and gap-series helpers for the gate computation.
//!
//! Everything here is plain `f64` math: the inputs are draw counts, not
//! money, and percentile interpolation is inherently fractional.

/// Percentile (0–100) with linear interpolation between closest ranks.
///
/// Standard method: sort, `rank = (n - 1) * p / 100`, interpolate between
/// the floor and ceiling ranks. `p <= 0` yields the minimum, `p >= 100`
/// the maximum, and an empty input yields 0.0.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut xs: Vec<f64> = values.to_vec();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    if p <= 0.0 {
        return xs[0];
    }
    if p >= 100.0 {
        return xs[xs.len() - 1];
    }

    let rank = (xs.len() - 1) as f64 * (p / 100.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return xs[lower];
    }
    xs[lower] * (upper as f64 - rank) + xs[upper] * (rank - lower as f64)
}

/// Consecutive differences between successive positions, in order.
///
/// Fewer than two positions means no measurable gap — the caller treats an
/// empty series as "insufficient successes".
pub fn gap_series(positions: &[usize]) -> Vec<f64> {
    let mut sorted: Vec<usize> = positions.to_vec();
    sorted.sort_unstable();
    sorted
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) as f64)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

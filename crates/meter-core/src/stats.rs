//! Descriptive statistics and z-scores over bucketed readings.

use serde::{Deserialize, Serialize};

/// Default anomaly threshold in standard deviations.
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 3.0;

// ── Percentile helper ─────────────────────────────────────────────────────────

/// Compute the `p`-th percentile of a **sorted** slice using linear
/// interpolation between the closest ranks.
///
/// Returns `0.0` for an empty slice.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    let len = sorted_data.len();
    if len == 1 {
        return sorted_data[0];
    }
    let rank = (p / 100.0) * (len as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted_data[lo];
    }
    let frac = rank - lo as f64;
    sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo])
}

// ── Moments ───────────────────────────────────────────────────────────────────

/// Arithmetic mean; `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with `ddof` degrees of freedom removed.
///
/// Returns `0.0` when fewer than `ddof + 1` values are available.
pub fn std_dev(values: &[f64], ddof: usize) -> f64 {
    if values.len() <= ddof {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - ddof) as f64).sqrt()
}

/// Population z-score of every value.
///
/// Returns `None` for empty input and for zero variance, where the score is
/// undefined.
pub fn zscores(values: &[f64]) -> Option<Vec<f64>> {
    let sd = std_dev(values, 0);
    if values.is_empty() || sd == 0.0 || !sd.is_finite() {
        return None;
    }
    let m = mean(values);
    Some(values.iter().map(|v| (v - m) / sd).collect())
}

// ── ColumnStats ───────────────────────────────────────────────────────────────

/// Summary of one column: count, mean, sample deviation and quartiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n − 1).
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnStats {
    /// Describe `values`. An empty column yields all-zero statistics.
    pub fn describe(name: impl Into<String>, values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self {
            name: name.into(),
            count: values.len(),
            mean: mean(values),
            std: std_dev(values, 1),
            min: sorted.first().copied().unwrap_or(0.0),
            q25: percentile(&sorted, 25.0),
            median: percentile(&sorted, 50.0),
            q75: percentile(&sorted, 75.0),
            max: sorted.last().copied().unwrap_or(0.0),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

use serde::Serialize;

fn sorted(values: &[u64]) -> Vec<u64> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted
}

/// Arithmetic mean, 0.0 for an empty slice.
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

/// Median, averaging the two middle values for an even count.
#[allow(clippy::cast_precision_loss)]
pub fn median(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted(values);
    let mid = sorted.len() / 2;

    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    } else {
        sorted[mid] as f64
    }
}

/// 90th percentile using nearest rank with floor.
///
/// The index is `floor(len * 0.9)` clamped to the last element, so the
/// result is the `(index + 1)`-th smallest value. For `1..=100` that is 91,
/// not the 90 a ceiling-based nearest rank would give, and no interpolation
/// happens between neighbours.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn p90(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted(values);
    let index = ((sorted.len() as f64 * 0.9) as usize).min(sorted.len() - 1);
    sorted[index] as f64
}

/// Mean, median, P90 and sample count of one duration sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationStats {
    pub mean: f64,
    pub median: f64,
    pub p90: f64,
    pub count: usize,
}

impl DurationStats {
    pub fn from_durations(values: &[u64]) -> Self {
        Self {
            mean: mean(values),
            median: median(values),
            p90: p90(values),
            count: values.len(),
        }
    }
}

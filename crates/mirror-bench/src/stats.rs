use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Below this many samples nothing is trimmed.
pub const MIN_SAMPLES_FOR_TRIM: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub median_ms: f64,
}

fn sorted(samples_ms: &[f64]) -> Vec<f64> {
    let mut values = samples_ms.to_vec();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    values
}

pub fn compute_stats(samples_ms: &[f64]) -> Option<SampleStats> {
    if samples_ms.is_empty() {
        return None;
    }

    let values = sorted(samples_ms);
    let len = values.len();
    let sum: f64 = values.iter().sum();
    let median_ms = if len.is_multiple_of(2) {
        (values[(len / 2) - 1] + values[len / 2]) / 2.0
    } else {
        values[len / 2]
    };

    Some(SampleStats {
        min_ms: *values.first().unwrap_or(&0.0),
        max_ms: *values.last().unwrap_or(&0.0),
        mean_ms: sum / (len as f64),
        median_ms,
    })
}

/// Sorted samples with the single lowest and highest value removed.
///
/// With fewer than [`MIN_SAMPLES_FOR_TRIM`] samples nothing is removed.
pub fn trimmed_samples(samples_ms: &[f64]) -> Vec<f64> {
    let mut values = sorted(samples_ms);
    if values.len() >= MIN_SAMPLES_FOR_TRIM {
        values.pop();
        values.remove(0);
    }
    values
}

/// Mean of [`trimmed_samples`]; `None` for an empty sample set.
pub fn trimmed_mean(samples_ms: &[f64]) -> Option<f64> {
    let kept = trimmed_samples(samples_ms);
    if kept.is_empty() {
        return None;
    }
    Some(kept.iter().sum::<f64>() / kept.len() as f64)
}

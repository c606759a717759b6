use serde::{Deserialize, Serialize};

use crate::orchestrator::{Measurement, Measurements};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub accelerated_ms: f64,
    pub origin_ms: f64,
    /// Latency saved relative to origin, in percent. Never negative: an
    /// accelerated leg that is no faster reports 0 (parity).
    pub improvement_pct: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Mean improvement over the improved sites only; 0 when none improved.
    pub average_improvement_pct: f64,
    pub improved_sites: usize,
    pub total_sites: usize,
}

/// `None` unless both legs were measured.
pub fn compare(measurement: &Measurement) -> Option<Comparison> {
    let accelerated_ms = measurement.accelerated?;
    let origin_ms = measurement.origin?;
    Some(Comparison {
        accelerated_ms,
        origin_ms,
        improvement_pct: improvement_pct(accelerated_ms, origin_ms),
    })
}

fn improvement_pct(accelerated_ms: f64, origin_ms: f64) -> f64 {
    if origin_ms <= 0.0 {
        return 0.0;
    }
    let raw = (origin_ms - accelerated_ms) / origin_ms * 100.0;
    if raw.is_finite() {
        raw.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

pub fn summarize(measurements: &Measurements) -> RunSummary {
    let mut total_improvement = 0.0;
    let mut improved_sites = 0;
    for comparison in measurements.values().filter_map(compare) {
        if comparison.improvement_pct > 0.0 {
            total_improvement += comparison.improvement_pct;
            improved_sites += 1;
        }
    }

    RunSummary {
        average_improvement_pct: if improved_sites > 0 {
            total_improvement / improved_sites as f64
        } else {
            0.0
        },
        improved_sites,
        total_sites: measurements.len(),
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::BenchConfig;
use crate::stats::trimmed_mean;

pub mod probe;
pub mod warmup;

use probe::{sample_round, Probe};
use warmup::DnsWarmup;

/// Trimmed result of one leg plus the raw round samples it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegMeasurement {
    pub trimmed_ms: f64,
    pub samples: Vec<f64>,
}

/// Measures a URL over several sequential rounds and reduces them to a
/// trimmed mean.
#[derive(Clone, Debug)]
pub struct Estimator<P, W> {
    probe: P,
    warmup: W,
    rounds: u32,
    round_pause: Duration,
    penalty_ms: f64,
}

impl<P: Probe, W: DnsWarmup> Estimator<P, W> {
    pub fn new(probe: P, warmup: W, config: &BenchConfig) -> Self {
        Self {
            probe,
            warmup,
            rounds: config.rounds.max(1),
            round_pause: config.round_pause,
            penalty_ms: config.failure_penalty_ms,
        }
    }

    pub async fn measure(&self, url: &str, label: &str) -> LegMeasurement {
        self.warmup.warmup(url).await;

        let mut samples = Vec::with_capacity(self.rounds as usize);
        for round in 0..self.rounds {
            samples.push(sample_round(&self.probe, url, round, self.penalty_ms).await);
            if round + 1 < self.rounds {
                tokio::time::sleep(self.round_pause).await;
            }
        }

        let trimmed_ms = trimmed_mean(&samples).unwrap_or(self.penalty_ms);
        info!(label, url, ?samples, trimmed_ms, "leg measured");
        LegMeasurement {
            trimmed_ms,
            samples,
        }
    }
}

use std::time::Duration;

use crate::error::{BenchError, BenchResult};

pub const DEFAULT_PROVIDER_DOMAIN: &str = "fastly.8aka.cn";
pub const DEFAULT_ROUNDS: u32 = 3;
pub const DEFAULT_ROUND_PAUSE: Duration = Duration::from_millis(200);
pub const DEFAULT_SITE_PAUSE: Duration = Duration::from_millis(300);
pub const DEFAULT_WARMUP_SETTLE: Duration = Duration::from_millis(100);
pub const DEFAULT_FAILURE_PENALTY_MS: f64 = 1000.0;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Tunables for a measurement run and the periodic scheduler.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchConfig {
    /// Probe rounds per leg.
    pub rounds: u32,
    /// Pause between consecutive rounds (not after the last one).
    pub round_pause: Duration,
    /// Pause after each site before the next one starts.
    pub site_pause: Duration,
    /// How long a DNS warmup hint stays in place before it is retracted.
    pub warmup_settle: Duration,
    /// Added to a failed probe's elapsed time so failures rank as slow.
    pub failure_penalty_ms: f64,
    /// Transport timeout for a single probe.
    pub probe_timeout: Duration,
    /// Scheduler re-run interval.
    pub interval: Duration,
    /// Domain under which accelerated hosts are templated.
    pub provider_domain: String,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            round_pause: DEFAULT_ROUND_PAUSE,
            site_pause: DEFAULT_SITE_PAUSE,
            warmup_settle: DEFAULT_WARMUP_SETTLE,
            failure_penalty_ms: DEFAULT_FAILURE_PENALTY_MS,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            interval: DEFAULT_INTERVAL,
            provider_domain: DEFAULT_PROVIDER_DOMAIN.to_string(),
        }
    }
}

impl BenchConfig {
    pub fn validate(&self) -> BenchResult<()> {
        if self.rounds == 0 {
            return Err(BenchError::InvalidArgument(
                "rounds must be at least 1".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(BenchError::InvalidArgument(
                "interval must be greater than zero".to_string(),
            ));
        }
        if !self.failure_penalty_ms.is_finite() || self.failure_penalty_ms < 0.0 {
            return Err(BenchError::InvalidArgument(format!(
                "failure penalty must be a non-negative number of milliseconds, got {}",
                self.failure_penalty_ms
            )));
        }
        let domain = self.provider_domain.trim();
        if domain.is_empty() || domain.contains('/') {
            return Err(BenchError::InvalidArgument(format!(
                "provider domain '{}' is not a bare host name",
                self.provider_domain
            )));
        }
        Ok(())
    }
}

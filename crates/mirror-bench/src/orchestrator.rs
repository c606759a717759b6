use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::BenchConfig;
use crate::error::{BenchError, BenchResult};
use crate::runner::probe::Probe;
use crate::runner::warmup::DnsWarmup;
use crate::runner::{Estimator, LegMeasurement};
use crate::sites::Site;

/// Trimmed latency per leg for one site. A leg is `None` until measured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub accelerated: Option<f64>,
    pub origin: Option<f64>,
}

/// Measurements keyed by site name.
pub type Measurements = HashMap<String, Measurement>;

/// Legs completed out of the legs in a run; two legs per site.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunProgress {
    pub completed: usize,
    pub total: usize,
}

impl RunProgress {
    pub fn for_sites(site_count: usize) -> Self {
        Self {
            completed: 0,
            total: site_count * 2,
        }
    }

    pub fn advance(&mut self) {
        self.completed = (self.completed + 1).min(self.total);
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed as f64 / self.total as f64 * 100.0).min(100.0)
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed >= self.total
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SiteRun {
    pub site: Site,
    pub accelerated: LegMeasurement,
    pub origin: Option<LegMeasurement>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunOutcome {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub sites: Vec<SiteRun>,
    pub measurements: Measurements,
}

/// Measures sites one at a time, accelerated leg before origin leg, so at
/// most one probe is ever in flight.
pub struct Orchestrator<P, W> {
    estimator: Estimator<P, W>,
    sites: Vec<Site>,
    site_pause: Duration,
    running: AtomicBool,
    runs_completed: AtomicU64,
    progress: watch::Sender<RunProgress>,
    results: watch::Sender<Option<Arc<RunOutcome>>>,
}

impl<P: Probe, W: DnsWarmup> Orchestrator<P, W> {
    pub fn new(sites: Vec<Site>, estimator: Estimator<P, W>, config: &BenchConfig) -> Self {
        Self {
            estimator,
            sites,
            site_pause: config.site_pause,
            running: AtomicBool::new(false),
            runs_completed: AtomicU64::new(0),
            progress: watch::Sender::new(RunProgress::default()),
            results: watch::Sender::new(None),
        }
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> RunProgress {
        *self.progress.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<RunProgress> {
        self.progress.subscribe()
    }

    pub fn subscribe_results(&self) -> watch::Receiver<Option<Arc<RunOutcome>>> {
        self.results.subscribe()
    }

    pub fn latest(&self) -> Option<Arc<RunOutcome>> {
        self.results.borrow().clone()
    }

    /// Measures every site once.
    ///
    /// Fails only with [`BenchError::RunInProgress`] when another run holds
    /// the run guard; probe and warmup failures are absorbed into the samples.
    pub async fn run(&self) -> BenchResult<Arc<RunOutcome>> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            warn!("measurement run rejected: another run is in progress");
            return Err(BenchError::RunInProgress);
        };

        let started_at = Utc::now();
        let clock = Instant::now();
        if self.sites.is_empty() {
            warn!("no sites configured, nothing to measure");
            return Ok(Arc::new(RunOutcome {
                started_at,
                elapsed: Duration::ZERO,
                sites: Vec::new(),
                measurements: Measurements::new(),
            }));
        }

        info!(sites = self.sites.len(), "measurement run started");
        let mut progress = RunProgress::for_sites(self.sites.len());
        self.progress.send_replace(progress);

        let mut measurements = Measurements::with_capacity(self.sites.len());
        let mut site_runs = Vec::with_capacity(self.sites.len());
        for site in &self.sites {
            debug!(site = %site.name, "measuring site");

            let accelerated = self
                .estimator
                .measure(&site.accelerated_url, &format!("{} accelerated", site.name))
                .await;
            measurements.entry(site.name.clone()).or_default().accelerated =
                Some(accelerated.trimmed_ms);
            progress.advance();
            self.progress.send_replace(progress);

            let origin = match site.origin_target() {
                Some(url) => {
                    let leg = self
                        .estimator
                        .measure(url, &format!("{} origin", site.name))
                        .await;
                    measurements.entry(site.name.clone()).or_default().origin =
                        Some(leg.trimmed_ms);
                    Some(leg)
                }
                None => {
                    debug!(site = %site.name, "no origin url, origin leg skipped");
                    None
                }
            };
            // The origin leg counts toward progress whether or not it ran.
            progress.advance();
            self.progress.send_replace(progress);

            site_runs.push(SiteRun {
                site: site.clone(),
                accelerated,
                origin,
            });
            tokio::time::sleep(self.site_pause).await;
        }

        let outcome = Arc::new(RunOutcome {
            started_at,
            elapsed: clock.elapsed(),
            sites: site_runs,
            measurements,
        });
        self.results.send_replace(Some(Arc::clone(&outcome)));
        let completed = self.runs_completed.fetch_add(1, Ordering::AcqRel) + 1;
        info!(
            run = completed,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "measurement run finished"
        );
        Ok(outcome)
    }
}

/// Holds the single-run flag for the lifetime of a run.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

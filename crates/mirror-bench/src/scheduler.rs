use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::BenchError;
use crate::orchestrator::Orchestrator;
use crate::runner::probe::Probe;
use crate::runner::warmup::DnsWarmup;

#[derive(Clone, Copy, Debug)]
enum Trigger {
    Immediate,
    Tick,
}

#[derive(Debug, Default)]
struct ScheduleState {
    enabled: bool,
    timer: Option<CancellationToken>,
}

/// Re-runs the orchestrator on a fixed interval. Ticks that land during a
/// run are dropped, not queued. Stopping never cancels a run in flight.
pub struct Scheduler<P, W> {
    orchestrator: Arc<Orchestrator<P, W>>,
    interval: Duration,
    state: ScheduleState,
}

impl<P, W> Scheduler<P, W> {
    pub fn new(orchestrator: Arc<Orchestrator<P, W>>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
            state: ScheduleState::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.enabled
    }

    pub fn stop(&mut self) {
        if !self.state.enabled {
            return;
        }
        self.state.enabled = false;
        self.release_timer();
        info!("scheduler stopped");
    }

    /// Releases the timer whatever the current state. Also runs on drop.
    pub fn dispose(&mut self) {
        self.state.enabled = false;
        self.release_timer();
    }

    fn release_timer(&mut self) {
        if let Some(timer) = self.state.timer.take() {
            timer.cancel();
        }
    }
}

impl<P, W> Scheduler<P, W>
where
    P: Probe + 'static,
    W: DnsWarmup + 'static,
{
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.state.enabled {
            debug!("scheduler already active");
            return;
        }

        spawn_run(Arc::clone(&self.orchestrator), Trigger::Immediate);

        let timer = CancellationToken::new();
        tokio::spawn(tick_loop(
            Arc::clone(&self.orchestrator),
            self.interval,
            timer.clone(),
        ));
        self.state = ScheduleState {
            enabled: true,
            timer: Some(timer),
        };
        info!(interval_secs = self.interval.as_secs(), "scheduler started");
    }
}

impl<P, W> Drop for Scheduler<P, W> {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn tick_loop<P, W>(
    orchestrator: Arc<Orchestrator<P, W>>,
    period: Duration,
    timer: CancellationToken,
) where
    P: Probe + 'static,
    W: DnsWarmup + 'static,
{
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = timer.cancelled() => {
                debug!("scheduler timer released");
                return;
            }
            _ = ticker.tick() => {
                if orchestrator.is_running() {
                    debug!("run still in progress, tick skipped");
                    continue;
                }
                spawn_run(Arc::clone(&orchestrator), Trigger::Tick);
            }
        }
    }
}

fn spawn_run<P, W>(orchestrator: Arc<Orchestrator<P, W>>, trigger: Trigger)
where
    P: Probe + 'static,
    W: DnsWarmup + 'static,
{
    tokio::spawn(async move {
        match orchestrator.run().await {
            Ok(outcome) => debug!(?trigger, sites = outcome.sites.len(), "scheduled run done"),
            Err(BenchError::RunInProgress) => debug!(?trigger, "scheduled run skipped"),
            Err(error) => warn!(?trigger, %error, "scheduled run failed"),
        }
    });
}

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mirror_bench::config::BenchConfig;
use mirror_bench::orchestrator::Orchestrator;
use mirror_bench::runner::probe::{Probe, ProbeError};
use mirror_bench::runner::warmup::DnsWarmup;
use mirror_bench::runner::Estimator;
use mirror_bench::sites::Site;
use url::Url;

pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Probe that sleeps a scripted latency on tokio's clock instead of touching
/// the network. Latency is looked up by (host, round), then host, then default.
#[derive(Clone)]
pub struct ScriptedProbe {
    default_latency: Duration,
    by_host: HashMap<String, Duration>,
    by_round: HashMap<(String, u32), Duration>,
    failing: HashSet<(String, u32)>,
    events: EventLog,
}

impl ScriptedProbe {
    pub fn new(default_latency: Duration) -> Self {
        Self {
            default_latency,
            by_host: HashMap::new(),
            by_round: HashMap::new(),
            failing: HashSet::new(),
            events: EventLog::default(),
        }
    }

    pub fn with_host(mut self, host: &str, latency: Duration) -> Self {
        self.by_host.insert(host.to_string(), latency);
        self
    }

    pub fn with_round(mut self, host: &str, round: u32, latency: Duration) -> Self {
        self.by_round.insert((host.to_string(), round), latency);
        self
    }

    pub fn failing(mut self, host: &str, round: u32) -> Self {
        self.failing.insert((host.to_string(), round));
        self
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("event log").clone()
    }

    pub fn probe_events(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|event| event.starts_with("probe "))
            .collect()
    }

    pub fn probe_count(&self) -> usize {
        self.probe_events().len()
    }
}

impl Probe for ScriptedProbe {
    async fn probe(&self, url: &Url) -> Result<(), ProbeError> {
        let host = url.host_str().unwrap_or_default().to_string();
        let round = url
            .query_pairs()
            .find(|(key, _)| key == "_r")
            .and_then(|(_, value)| value.parse::<u32>().ok())
            .unwrap_or(0);
        self.events
            .lock()
            .expect("event log")
            .push(format!("probe {host} r{round}"));

        if self.failing.contains(&(host.clone(), round)) {
            return Err(ProbeError::Transport("scripted failure".to_string()));
        }
        let latency = self
            .by_round
            .get(&(host.clone(), round))
            .or_else(|| self.by_host.get(&host))
            .copied()
            .unwrap_or(self.default_latency);
        tokio::time::sleep(latency).await;
        Ok(())
    }
}

/// Records each warmup into the shared event log without waiting.
#[derive(Clone, Default)]
pub struct RecordingWarmup {
    events: EventLog,
}

impl RecordingWarmup {
    pub fn new(events: EventLog) -> Self {
        Self { events }
    }
}

impl DnsWarmup for RecordingWarmup {
    async fn warmup(&self, url: &str) {
        self.events
            .lock()
            .expect("event log")
            .push(format!("warmup {url}"));
    }
}

pub fn site(name: &str, accelerated: &str, origin: Option<&str>) -> Site {
    Site::new(name, accelerated, origin.map(str::to_string))
}

pub fn orchestrator(
    sites: Vec<Site>,
    probe: ScriptedProbe,
) -> Orchestrator<ScriptedProbe, RecordingWarmup> {
    let config = BenchConfig::default();
    let warmup = RecordingWarmup::new(probe.events.clone());
    Orchestrator::new(sites, Estimator::new(probe, warmup, &config), &config)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}
